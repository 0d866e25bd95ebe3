use super::{
    constants::{
        FALLBACK_MIDPOINT, FALLBACK_MIDPOINT_OFFSET, FALLBACK_STEEPNESS, FALLBACK_TIER_SLOPE, MAX_TIER,
        SMALL_LEADERBOARD_THRESHOLD
    },
    nig::NormalInverseGaussian,
    structures::{distribution_parameters::DistributionParameters, tier::Tier}
};
use crate::error::{PointsError, PointsResult};
use tracing::warn;

/// Which scoring model a leaderboard of a given size is scored with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelChoice {
    Parametric,
    Fallback
}

impl ModelChoice {
    pub fn for_sample_size(n: usize) -> Self {
        if n >= SMALL_LEADERBOARD_THRESHOLD {
            ModelChoice::Parametric
        } else {
            ModelChoice::Fallback
        }
    }
}

/// Sigmoid used while a leaderboard is too small to fit.
///
/// `(1 + e^(-0.5k)) / (1 + e^(k·(time/best - 1.5)))` with `k = 2.1 - 0.25·tier`.
pub fn fallback_fraction(time: f64, best_time: f64, tier: Tier) -> f64 {
    let k = FALLBACK_STEEPNESS - FALLBACK_TIER_SLOPE * tier.value() as f64;

    (1.0 + (k * FALLBACK_MIDPOINT_OFFSET).exp()) / (1.0 + (k * (time / best_time - FALLBACK_MIDPOINT)).exp())
}

#[derive(Debug, Clone, Copy)]
pub enum ScoringModel {
    Parametric {
        distribution: NormalInverseGaussian,
        top_scale: f64
    },
    Fallback {
        tier: Tier
    }
}

/// Everything needed to turn a time into a points fraction on one leaderboard.
#[derive(Debug, Clone, Copy)]
pub struct LeaderboardModel {
    best_time: f64,
    model: ScoringModel
}

impl LeaderboardModel {
    /// Picks the model from the leaderboard size. A parametric-size
    /// leaderboard without parameters has not been refit yet and is scored
    /// with the fallback until it is.
    pub fn new(
        tier: Tier,
        best_time: f64,
        sample_size: usize,
        parameters: Option<&DistributionParameters>
    ) -> PointsResult<Self> {
        match (ModelChoice::for_sample_size(sample_size), parameters) {
            (ModelChoice::Parametric, Some(parameters)) => Self::parametric(best_time, parameters),
            (ModelChoice::Parametric, None) => {
                warn!(
                    sample_size,
                    "No distribution parameters for a leaderboard of parametric size, using fallback"
                );
                Self::fallback(tier, best_time)
            }
            (ModelChoice::Fallback, _) => Self::fallback(tier, best_time)
        }
    }

    /// Fails for tiers whose sigmoid would not decrease with time.
    pub fn fallback(tier: Tier, best_time: f64) -> PointsResult<Self> {
        check_time("best time", best_time)?;
        if tier.value() > MAX_TIER {
            return Err(PointsError::InvalidArgument(format!(
                "fallback scoring supports tiers up to {}, got {}",
                MAX_TIER,
                tier.value()
            )));
        }

        Ok(LeaderboardModel {
            best_time,
            model: ScoringModel::Fallback { tier }
        })
    }

    pub fn parametric(best_time: f64, parameters: &DistributionParameters) -> PointsResult<Self> {
        check_time("best time", best_time)?;
        if !parameters.is_valid() {
            return Err(PointsError::InvalidArgument(format!(
                "distribution parameters {:?} are not a valid fit",
                parameters
            )));
        }

        Ok(LeaderboardModel {
            best_time,
            model: ScoringModel::Parametric {
                distribution: NormalInverseGaussian::new(parameters.shape())?,
                top_scale: parameters.top_scale
            }
        })
    }

    pub fn choice(&self) -> ModelChoice {
        match self.model {
            ScoringModel::Parametric { .. } => ModelChoice::Parametric,
            ScoringModel::Fallback { .. } => ModelChoice::Fallback
        }
    }

    pub fn best_time(&self) -> f64 {
        self.best_time
    }

    pub fn score(&self, time: f64) -> PointsResult<f64> {
        check_time("time", time)?;

        Ok(match self.model {
            ScoringModel::Parametric {
                distribution,
                top_scale
            } => distribution.sf(time) / top_scale,
            ScoringModel::Fallback { tier } => fallback_fraction(time, self.best_time, tier)
        })
    }
}

fn check_time(name: &str, value: f64) -> PointsResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PointsError::InvalidArgument(format!(
            "{} must be finite and positive, got {}",
            name, value
        )))
    }
}
