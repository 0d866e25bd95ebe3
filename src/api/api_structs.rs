use crate::model::structures::{distribution_parameters::DistributionParameters, filter_update::Timings};
use serde::{Deserialize, Serialize};

/// Refit request, one per line: `{"filter_id": 74}`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FilterRequest {
    pub filter_id: i32
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FilterResponse {
    pub filter_id: i32,
    pub timings: Timings
}

/// What a caller knows about one leaderboard when scoring a single run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardData {
    pub tier: i64,
    /// Best time on the leaderboard
    pub wr: f64,
    pub leaderboard_size: usize,
    /// Parameters of the last refit. Absent or `null` when the leaderboard
    /// has never been fitted.
    #[serde(default)]
    pub dist_params: Option<DistributionParameters>
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RunRequest {
    pub time: f64,
    pub nub_data: LeaderboardData,
    #[serde(default)]
    pub pro_data: Option<LeaderboardData>
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RunResponse {
    pub nub_fraction: f64,
    /// `null` when no pro data was sent
    pub pro_fraction: Option<f64>
}
