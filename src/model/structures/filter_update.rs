use super::{distribution_parameters::DistributionParameters, leaderboard_kind::LeaderboardKind, tier::Tier};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterTiers {
    pub nub: Tier,
    pub pro: Tier
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecordScore {
    pub record_id: i64,
    pub points: f64
}

/// New scores for every record of one leaderboard, plus its parameters when
/// the leaderboard was refit.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardUpdate {
    pub kind: LeaderboardKind,
    pub scores: Vec<RecordScore>,
    pub parameters: Option<DistributionParameters>
}

/// Everything a refit writes back. Committed as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterUpdate {
    pub filter_id: i32,
    pub nub: LeaderboardUpdate,
    /// `None` when the filter has no pro records
    pub pro: Option<LeaderboardUpdate>
}

impl FilterUpdate {
    pub fn leaderboards(&self) -> impl Iterator<Item = &LeaderboardUpdate> {
        std::iter::once(&self.nub).chain(self.pro.as_ref())
    }
}

/// Wall-clock milliseconds spent in each stage of a refit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Timings {
    pub db_query_ms: f64,
    pub nub_fit_ms: f64,
    pub nub_compute_ms: f64,
    pub pro_fit_ms: f64,
    pub pro_compute_ms: f64,
    pub db_write_ms: f64,
    pub total_ms: f64
}

impl Timings {
    /// Sum of the individual stages
    pub fn stages_total(&self) -> f64 {
        self.db_query_ms + self.nub_fit_ms + self.nub_compute_ms + self.pro_fit_ms + self.pro_compute_ms + self.db_write_ms
    }
}
