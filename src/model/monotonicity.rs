use super::scoring::LeaderboardModel;
use crate::error::PointsResult;

/// A pro run is never worth less than the same time on the nub leaderboard.
pub fn resolve(pro_score: f64, nub_score: f64) -> f64 {
    pro_score.max(nub_score)
}

/// Scores `time` on the pro leaderboard, raised to the nub score for the same
/// time where that is higher. Nub scores are never adjusted.
pub fn pro_fraction(time: f64, pro: &LeaderboardModel, nub: &LeaderboardModel) -> PointsResult<f64> {
    Ok(resolve(pro.score(time)?, nub.score(time)?))
}
