pub mod distribution_parameters;
pub mod filter_update;
pub mod leaderboard;
pub mod leaderboard_kind;
pub mod tier;
