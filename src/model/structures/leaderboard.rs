use serde::Serialize;

/// One personal best on a leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LeaderboardRecord {
    pub record_id: i64,
    /// Seconds
    pub time: f64,
    /// Points fraction currently stored for this record
    pub points: f64
}

/// The complete time sample for one (filter, kind), sorted by time ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeaderboardSnapshot {
    records: Vec<LeaderboardRecord>
}

impl LeaderboardSnapshot {
    /// Sorts the records so index 0 always holds the best time.
    pub fn new(mut records: Vec<LeaderboardRecord>) -> Self {
        records.sort_by(|a, b| a.time.total_cmp(&b.time));
        LeaderboardSnapshot { records }
    }

    pub fn records(&self) -> &[LeaderboardRecord] {
        &self.records
    }

    pub fn times(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.time).collect()
    }

    pub fn best_time(&self) -> Option<f64> {
        self.records.first().map(|r| r.time)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
