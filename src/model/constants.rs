// Model selection
pub const SMALL_LEADERBOARD_THRESHOLD: usize = 50;

// Fallback sigmoid: (1 + e^(k·MIDPOINT_OFFSET)) / (1 + e^(k·(time/best - MIDPOINT)))
// with k = FALLBACK_STEEPNESS - FALLBACK_TIER_SLOPE·tier
pub const FALLBACK_STEEPNESS: f64 = 2.1;
pub const FALLBACK_TIER_SLOPE: f64 = 0.25;
pub const FALLBACK_MIDPOINT: f64 = 1.5;
pub const FALLBACK_MIDPOINT_OFFSET: f64 = -0.5;

// Optimizer defaults
pub const DEFAULT_MAX_ITERATIONS: usize = 20_000;
pub const DEFAULT_TOLERANCE: f64 = 1e-10;
pub const DEFAULT_TIME_BUDGET_MS: u64 = 10_000;

// Numerical integration of the survival function
pub const SF_TOLERANCE: f64 = 1e-10;
pub const SF_TAIL_CUTOFF: f64 = 1e-17;
pub const SF_MAX_SEGMENTS: usize = 256;
pub const SF_MAX_DEPTH: u32 = 16;

// Highest tier for which the fallback steepness stays positive
pub const MAX_TIER: u8 = 8;

// Bounds on the fitted shape `a`. Leaderboards close to an inverse Gaussian
// push `a` and `b` towards infinity along a flat ridge of the likelihood.
pub const MIN_SHAPE: f64 = 1e-4;
pub const MAX_SHAPE: f64 = 1e4;

// Lower bound on the fitted scale relative to the sample standard deviation.
// Below it the density collapses onto tied times.
pub const MIN_SCALE_RATIO: f64 = 1e-3;

// Fitted survival probability allowed at the sample median
pub const MEDIAN_SF_RANGE: (f64, f64) = (0.1, 0.9);
