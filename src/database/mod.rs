pub mod db;

use crate::{
    error::PointsResult,
    model::structures::{
        distribution_parameters::DistributionParameters,
        filter_update::{FilterTiers, FilterUpdate},
        leaderboard::LeaderboardSnapshot,
        leaderboard_kind::LeaderboardKind
    }
};

/// Storage behind a refit. Implementations own the records and parameters;
/// the engine only exchanges them by value.
///
/// Refits of the same filter must not overlap. Nothing here locks.
#[allow(async_fn_in_trait)]
pub trait PointsStore {
    /// Tiers of the filter, or `None` if the filter does not exist
    async fn fetch_tiers(&self, filter_id: i32) -> PointsResult<Option<FilterTiers>>;

    async fn fetch_snapshot(&self, filter_id: i32, kind: LeaderboardKind) -> PointsResult<LeaderboardSnapshot>;

    /// Parameters persisted by the previous refit, if any
    async fn fetch_parameters(
        &self,
        filter_id: i32,
        kind: LeaderboardKind
    ) -> PointsResult<Option<DistributionParameters>>;

    /// Writes every score and the parameters of refit leaderboards, all or nothing.
    async fn commit(&self, update: &FilterUpdate) -> PointsResult<()>;
}
