use crate::{
    database::PointsStore,
    error::PointsResult,
    model::structures::{
        distribution_parameters::{DistributionParameters, NigShape},
        filter_update::{FilterTiers, FilterUpdate},
        leaderboard::{LeaderboardRecord, LeaderboardSnapshot},
        leaderboard_kind::LeaderboardKind,
        tier::Tier
    }
};
use itertools::Itertools;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::{collections::HashMap, f64::consts::PI, sync::Mutex};

/// Draws `n` positive times from a normal-inverse Gaussian distribution,
/// sorted ascending. The same seed always gives the same times.
pub fn generate_nig_times(shape: &NigShape, n: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let gamma = (shape.a * shape.a - shape.b * shape.b).sqrt();

    let mut times = Vec::with_capacity(n);
    while times.len() < n {
        // Normal variance-mean mixture over an inverse Gaussian with mean 1/γ and shape 1
        let v = inverse_gaussian(&mut rng, 1.0 / gamma, 1.0);
        let x = shape.b * v + v.sqrt() * standard_normal(&mut rng);
        let time = shape.loc + shape.scale * x;

        if time > 0.0 {
            times.push(time);
        }
    }

    times.sort_by(|a, b| a.total_cmp(b));
    times
}

fn standard_normal(rng: &mut ChaCha8Rng) -> f64 {
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();

    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

fn inverse_gaussian(rng: &mut ChaCha8Rng, mean: f64, shape: f64) -> f64 {
    let n = standard_normal(rng);
    let y = n * n;
    let x = mean + mean * mean * y / (2.0 * shape)
        - mean / (2.0 * shape) * (4.0 * mean * shape * y + mean * mean * y * y).sqrt();

    if rng.random::<f64>() <= mean / (mean + x) {
        x
    } else {
        mean * mean / x
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    tiers: HashMap<i32, FilterTiers>,
    records: HashMap<(i32, LeaderboardKind), Vec<LeaderboardRecord>>,
    parameters: HashMap<(i32, LeaderboardKind), DistributionParameters>,
    next_record_id: i64,
    commits: usize
}

/// In-memory [`PointsStore`] for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn add_filter(&self, filter_id: i32, nub_tier: i64, pro_tier: i64) {
        let tiers = FilterTiers {
            nub: Tier::try_from(nub_tier).unwrap(),
            pro: Tier::try_from(pro_tier).unwrap()
        };
        self.state.lock().unwrap().tiers.insert(filter_id, tiers);
    }

    /// Adds one record per time, with zero points
    pub fn add_records(&self, filter_id: i32, kind: LeaderboardKind, times: &[f64]) {
        let mut state = self.state.lock().unwrap();

        for &time in times {
            let record_id = state.next_record_id;
            state.next_record_id += 1;
            state.records.entry((filter_id, kind)).or_default().push(LeaderboardRecord {
                record_id,
                time,
                points: 0.0
            });
        }
    }

    pub fn set_parameters(&self, filter_id: i32, kind: LeaderboardKind, parameters: DistributionParameters) {
        self.state
            .lock()
            .unwrap()
            .parameters
            .insert((filter_id, kind), parameters);
    }

    pub fn parameters(&self, filter_id: i32, kind: LeaderboardKind) -> Option<DistributionParameters> {
        self.state.lock().unwrap().parameters.get(&(filter_id, kind)).copied()
    }

    /// `(time, points)` of every record, fastest first
    pub fn points(&self, filter_id: i32, kind: LeaderboardKind) -> Vec<(f64, f64)> {
        let state = self.state.lock().unwrap();

        state
            .records
            .get(&(filter_id, kind))
            .map(|records| {
                records
                    .iter()
                    .map(|r| (r.time, r.points))
                    .sorted_by(|a, b| a.0.total_cmp(&b.0))
                    .collect_vec()
            })
            .unwrap_or_default()
    }

    pub fn commits(&self) -> usize {
        self.state.lock().unwrap().commits
    }
}

impl PointsStore for MemoryStore {
    async fn fetch_tiers(&self, filter_id: i32) -> PointsResult<Option<FilterTiers>> {
        Ok(self.state.lock().unwrap().tiers.get(&filter_id).copied())
    }

    async fn fetch_snapshot(&self, filter_id: i32, kind: LeaderboardKind) -> PointsResult<LeaderboardSnapshot> {
        let records = self
            .state
            .lock()
            .unwrap()
            .records
            .get(&(filter_id, kind))
            .cloned()
            .unwrap_or_default();

        Ok(LeaderboardSnapshot::new(records))
    }

    async fn fetch_parameters(
        &self,
        filter_id: i32,
        kind: LeaderboardKind
    ) -> PointsResult<Option<DistributionParameters>> {
        Ok(self.parameters(filter_id, kind))
    }

    async fn commit(&self, update: &FilterUpdate) -> PointsResult<()> {
        let mut state = self.state.lock().unwrap();

        for leaderboard in update.leaderboards() {
            let points: HashMap<i64, f64> = leaderboard.scores.iter().map(|s| (s.record_id, s.points)).collect();

            if let Some(records) = state.records.get_mut(&(update.filter_id, leaderboard.kind)) {
                for record in records.iter_mut() {
                    if let Some(&p) = points.get(&record.record_id) {
                        record.points = p;
                    }
                }
            }

            if let Some(parameters) = leaderboard.parameters {
                state.parameters.insert((update.filter_id, leaderboard.kind), parameters);
            }
        }

        state.commits += 1;
        Ok(())
    }
}
