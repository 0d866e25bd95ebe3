use serde_repr::{Deserialize_repr, Serialize_repr};
use std::fmt;
use strum_macros::EnumIter;

/// The two parallel rankings kept for every filter. `Nub` is the overall
/// leaderboard (every run), `Pro` only holds runs without teleports.
#[derive(Deserialize_repr, Serialize_repr, Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
#[repr(u8)]
pub enum LeaderboardKind {
    Nub = 0,
    Pro = 1
}

impl LeaderboardKind {
    /// Value of the `is_pro_leaderboard` column
    pub fn is_pro(self) -> bool {
        self == LeaderboardKind::Pro
    }
}

impl fmt::Display for LeaderboardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeaderboardKind::Nub => write!(f, "nub"),
            LeaderboardKind::Pro => write!(f, "pro")
        }
    }
}
