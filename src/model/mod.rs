pub mod constants;
pub mod fitter;
pub mod monotonicity;
pub mod nig;
pub mod optimizer;
pub mod recalculator;
pub mod scoring;
pub mod single_run;
pub mod structures;
