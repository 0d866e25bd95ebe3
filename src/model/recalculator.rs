use super::{
    fitter::DistributionFitter,
    monotonicity::pro_fraction,
    scoring::{LeaderboardModel, ModelChoice},
    structures::{
        distribution_parameters::DistributionParameters,
        filter_update::{FilterTiers, FilterUpdate, LeaderboardUpdate, RecordScore, Timings},
        leaderboard::LeaderboardSnapshot,
        leaderboard_kind::LeaderboardKind
    }
};
use crate::{
    database::PointsStore,
    error::{PointsError, PointsResult}
};
use std::time::Instant;
use tracing::{debug, info};

/// Everything a refit of one filter reads.
#[derive(Debug, Clone)]
pub struct FilterSnapshot {
    pub filter_id: i32,
    pub tiers: FilterTiers,
    pub nub: LeaderboardSnapshot,
    pub pro: LeaderboardSnapshot,
    pub nub_prior: Option<DistributionParameters>,
    pub pro_prior: Option<DistributionParameters>
}

/// Refits and rescores both leaderboards of a filter.
///
/// Nub and pro are fitted in parallel. Scoring starts once both fits are
/// done, since pro scores are raised to the nub score for the same time.
/// Fit and compute timings are written to `timings`.
pub fn recalculate(
    snapshot: &FilterSnapshot,
    fitter: &DistributionFitter,
    timings: &mut Timings
) -> PointsResult<FilterUpdate> {
    let filter_id = snapshot.filter_id;
    let nub_best = snapshot.nub.best_time().ok_or(PointsError::NoData { filter_id })?;

    let ((nub_fit, nub_fit_ms), (pro_fit, pro_fit_ms)) = rayon::join(
        || fit_leaderboard(filter_id, LeaderboardKind::Nub, &snapshot.nub, snapshot.nub_prior.as_ref(), fitter),
        || fit_leaderboard(filter_id, LeaderboardKind::Pro, &snapshot.pro, snapshot.pro_prior.as_ref(), fitter)
    );
    timings.nub_fit_ms = nub_fit_ms;
    timings.pro_fit_ms = pro_fit_ms;
    let nub_parameters = nub_fit?;
    let pro_parameters = pro_fit?;

    let start = Instant::now();
    let nub_model = LeaderboardModel::new(
        snapshot.tiers.nub,
        nub_best,
        snapshot.nub.len(),
        nub_parameters.as_ref()
    )?;
    let nub_scores = score_records(&snapshot.nub, |time| nub_model.score(time))?;
    timings.nub_compute_ms = elapsed_ms(start);

    let pro = match snapshot.pro.best_time() {
        Some(pro_best) => {
            let start = Instant::now();
            let pro_model = LeaderboardModel::new(
                snapshot.tiers.pro,
                pro_best,
                snapshot.pro.len(),
                pro_parameters.as_ref()
            )?;
            let scores = score_records(&snapshot.pro, |time| pro_fraction(time, &pro_model, &nub_model))?;
            timings.pro_compute_ms = elapsed_ms(start);

            Some(LeaderboardUpdate {
                kind: LeaderboardKind::Pro,
                scores,
                parameters: pro_parameters
            })
        }
        None => {
            debug!(filter_id, "No pro records, skipping pro leaderboard");
            timings.pro_compute_ms = 0.0;
            None
        }
    };

    Ok(FilterUpdate {
        filter_id,
        nub: LeaderboardUpdate {
            kind: LeaderboardKind::Nub,
            scores: nub_scores,
            parameters: nub_parameters
        },
        pro
    })
}

/// Fits the leaderboard when it is large enough for the parametric model.
/// Returns the new parameters, if any, and the milliseconds spent fitting.
fn fit_leaderboard(
    filter_id: i32,
    kind: LeaderboardKind,
    snapshot: &LeaderboardSnapshot,
    prior: Option<&DistributionParameters>,
    fitter: &DistributionFitter
) -> (PointsResult<Option<DistributionParameters>>, f64) {
    if ModelChoice::for_sample_size(snapshot.len()) == ModelChoice::Fallback {
        return (Ok(None), 0.0);
    }

    let start = Instant::now();
    let prior = prior.map(|p| p.shape());
    let result = fitter.fit(&snapshot.times(), prior.as_ref()).map(|fit| {
        debug!(
            filter_id,
            %kind,
            n = snapshot.len(),
            iterations = fit.iterations,
            warm_started = fit.warm_started,
            "Refit leaderboard"
        );
        Some(fit.parameters)
    });

    (result, elapsed_ms(start))
}

fn score_records<F>(snapshot: &LeaderboardSnapshot, score: F) -> PointsResult<Vec<RecordScore>>
where
    F: Fn(f64) -> PointsResult<f64>
{
    snapshot
        .records()
        .iter()
        .map(|record| {
            Ok(RecordScore {
                record_id: record.record_id,
                points: score(record.time)?
            })
        })
        .collect()
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Runs refits against a [`PointsStore`].
pub struct BatchRecalculator<S> {
    store: S,
    fitter: DistributionFitter
}

impl<S: PointsStore> BatchRecalculator<S> {
    pub fn new(store: S, fitter: DistributionFitter) -> Self {
        BatchRecalculator { store, fitter }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads the filter, refits it and commits the new scores and parameters.
    /// On failure nothing is committed.
    pub async fn recalculate(&self, filter_id: i32) -> PointsResult<Timings> {
        let mut timings = Timings::default();

        let start = Instant::now();
        let tiers = self
            .store
            .fetch_tiers(filter_id)
            .await?
            .ok_or(PointsError::FilterNotFound { filter_id })?;
        let snapshot = FilterSnapshot {
            filter_id,
            tiers,
            nub: self.store.fetch_snapshot(filter_id, LeaderboardKind::Nub).await?,
            pro: self.store.fetch_snapshot(filter_id, LeaderboardKind::Pro).await?,
            nub_prior: self.store.fetch_parameters(filter_id, LeaderboardKind::Nub).await?,
            pro_prior: self.store.fetch_parameters(filter_id, LeaderboardKind::Pro).await?
        };
        timings.db_query_ms = elapsed_ms(start);

        let update = recalculate(&snapshot, &self.fitter, &mut timings)?;

        let start = Instant::now();
        self.store.commit(&update).await?;
        timings.db_write_ms = elapsed_ms(start);
        timings.total_ms = timings.stages_total();

        info!(
            filter_id,
            nub = snapshot.nub.len(),
            pro = snapshot.pro.len(),
            total_ms = timings.total_ms,
            "Recalculated filter"
        );

        Ok(timings)
    }
}
