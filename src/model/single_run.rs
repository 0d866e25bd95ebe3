use super::{monotonicity::pro_fraction, scoring::LeaderboardModel, structures::tier::Tier};
use crate::{
    api::api_structs::{LeaderboardData, RunRequest, RunResponse},
    error::PointsResult
};

impl LeaderboardData {
    /// Same model a refit scores the leaderboard's records with.
    pub fn model(&self) -> PointsResult<LeaderboardModel> {
        LeaderboardModel::new(
            Tier::try_from(self.tier)?,
            self.wr,
            self.leaderboard_size,
            self.dist_params.as_ref()
        )
    }
}

/// Scores one submission against persisted parameters. No fitting happens
/// here, so this is cheap, pure and safe to call concurrently.
pub fn score_run(request: &RunRequest) -> PointsResult<RunResponse> {
    let nub = request.nub_data.model()?;
    let nub_fraction = nub.score(request.time)?;

    let pro_fraction = match &request.pro_data {
        Some(pro_data) => Some(pro_fraction(request.time, &pro_data.model()?, &nub)?),
        None => None
    };

    Ok(RunResponse {
        nub_fraction,
        pro_fraction
    })
}
