use crate::error::PointsError;
use serde::Serialize;
use std::convert::TryFrom;

/// Difficulty rating of a filter for one leaderboard kind.
/// Only the fallback model reads it, and checks its upper bound.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tier(u8);

impl Tier {
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Tier {
    type Error = PointsError;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        if v < 0 {
            return Err(PointsError::InvalidArgument(format!("tier must be non-negative, got {}", v)));
        }

        u8::try_from(v)
            .map(Tier)
            .map_err(|_| PointsError::InvalidArgument(format!("tier {} is out of range", v)))
    }
}
