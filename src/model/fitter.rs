use super::{
    constants::{
        DEFAULT_MAX_ITERATIONS, DEFAULT_TIME_BUDGET_MS, DEFAULT_TOLERANCE, MAX_SHAPE, MEDIAN_SF_RANGE,
        MIN_SCALE_RATIO, MIN_SHAPE, SMALL_LEADERBOARD_THRESHOLD
    },
    nig::{log_likelihood, NormalInverseGaussian},
    optimizer::{Minimum, NelderMead},
    structures::distribution_parameters::{DistributionParameters, NigShape}
};
use crate::error::{PointsError, PointsResult};
use statrs::statistics::Statistics;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const COLD_STEP: f64 = 0.25;
const WARM_STEP: f64 = 0.1;
const MAX_SKEW_RATIO: f64 = 0.9;

#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    /// Iteration cap for each optimizer pass
    pub max_iterations: usize,
    /// Relative spread of the mean negative log-likelihood at which a pass stops
    pub tolerance: f64,
    /// Wall-clock budget for the whole fit. Overruns are reported as divergence.
    pub time_budget: Duration
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            time_budget: Duration::from_millis(DEFAULT_TIME_BUDGET_MS)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Fit {
    pub parameters: DistributionParameters,
    pub iterations: usize,
    pub warm_started: bool
}

/// Maximum-likelihood fit of a normal-inverse Gaussian distribution to a
/// leaderboard's times.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistributionFitter {
    options: FitOptions
}

impl DistributionFitter {
    pub fn new(options: FitOptions) -> Self {
        DistributionFitter { options }
    }

    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    /// Fits `times`, which must be sorted ascending and hold at least
    /// [`SMALL_LEADERBOARD_THRESHOLD`] positive values.
    ///
    /// A valid `prior` seeds the optimizer, which keeps successive fits of a
    /// slowly growing leaderboard close together. Without one the search starts
    /// from a method-of-moments guess.
    ///
    /// `top_scale` of the result is the survival probability at `times[0]`.
    pub fn fit(&self, times: &[f64], prior: Option<&NigShape>) -> PointsResult<Fit> {
        validate_sample(times)?;

        let moments = SampleMoments::of(times);
        if !(moments.sd > 0.0) || !moments.sd.is_finite() {
            return Err(PointsError::FitDivergence(format!(
                "sample of {} times has no spread",
                times.len()
            )));
        }

        let warm = prior.filter(|p| p.is_valid()).copied();
        if prior.is_some() && warm.is_none() {
            warn!("Ignoring invalid previous distribution parameters {:?}", prior);
        }

        let space = SearchSpace {
            mean: moments.mean,
            sd: moments.sd
        };
        let start = space.encode(&warm.unwrap_or_else(|| moments.initial_guess()));
        let steps = [if warm.is_some() { WARM_STEP } else { COLD_STEP }; 4];

        let n = times.len() as f64;
        let mut objective = |theta: &[f64]| match space.decode(theta) {
            Some(shape) => -log_likelihood(&shape, times) / n,
            None => f64::INFINITY
        };

        let optimizer = NelderMead {
            max_iterations: self.options.max_iterations,
            tolerance: self.options.tolerance,
            deadline: Some(Instant::now() + self.options.time_budget)
        };

        // Restarting from the first optimum rebuilds a simplex that may have
        // collapsed prematurely
        let first = optimizer.minimize(&mut objective, &start, &steps);
        check_converged(&first)?;
        let second = optimizer.minimize(&mut objective, &first.point, &steps);
        check_converged(&second)?;

        let iterations = first.iterations + second.iterations;
        let best = if second.value <= first.value { second } else { first };

        let shape = space
            .decode(&best.point)
            .ok_or_else(|| PointsError::FitDivergence("optimum left the parameter space".to_string()))?;
        let dist = NormalInverseGaussian::new(shape).map_err(|e| PointsError::FitDivergence(e.to_string()))?;
        check_not_degenerate(&space, &dist, times)?;

        let top_scale = dist.sf(times[0]);
        if !top_scale.is_finite() || top_scale <= 0.0 {
            return Err(PointsError::FitDivergence(format!(
                "survival probability at the best time {} is {}",
                times[0], top_scale
            )));
        }

        debug!(
            n = times.len(),
            iterations,
            warm_started = warm.is_some(),
            a = shape.a,
            b = shape.b,
            loc = shape.loc,
            scale = shape.scale,
            top_scale,
            "Fitted distribution"
        );

        Ok(Fit {
            parameters: DistributionParameters::new(shape, top_scale),
            iterations,
            warm_started: warm.is_some()
        })
    }
}

fn validate_sample(times: &[f64]) -> PointsResult<()> {
    if times.len() < SMALL_LEADERBOARD_THRESHOLD {
        return Err(PointsError::InvalidArgument(format!(
            "need at least {} times to fit a distribution, got {}",
            SMALL_LEADERBOARD_THRESHOLD,
            times.len()
        )));
    }

    if let Some(bad) = times.iter().find(|t| !t.is_finite() || **t <= 0.0) {
        return Err(PointsError::InvalidArgument(format!("time must be finite and positive, got {}", bad)));
    }

    if !times.windows(2).all(|w| w[0] <= w[1]) {
        return Err(PointsError::InvalidArgument("times must be sorted ascending".to_string()));
    }

    Ok(())
}

fn check_converged(min: &Minimum) -> PointsResult<()> {
    if min.converged() {
        return Ok(());
    }

    Err(PointsError::FitDivergence(format!(
        "optimizer stopped after {} iterations ({:?}) without converging",
        min.iterations, min.termination
    )))
}

/// Rejects optima where the density has collapsed onto a cluster of tied
/// times instead of describing the whole leaderboard.
fn check_not_degenerate(space: &SearchSpace, dist: &NormalInverseGaussian, times: &[f64]) -> PointsResult<()> {
    let scale = dist.shape().scale;
    if scale <= 2.0 * MIN_SCALE_RATIO * space.sd {
        return Err(PointsError::FitDivergence(format!(
            "scale {} collapsed against its lower bound (sample sd {})",
            scale, space.sd
        )));
    }

    let median = times[times.len() / 2];
    let sf = dist.sf(median);
    let (low, high) = MEDIAN_SF_RANGE;
    if !(low..=high).contains(&sf) {
        return Err(PointsError::FitDivergence(format!(
            "survival probability at the sample median {} is {}",
            median, sf
        )));
    }

    Ok(())
}

/// Unconstrained coordinates for the optimizer:
/// `a = e^θ0`, `b = a·tanh(θ1)`, `loc = mean + sd·θ2`, `scale = sd·e^θ3`.
/// `scale` is kept above `MIN_SCALE_RATIO·sd`.
struct SearchSpace {
    mean: f64,
    sd: f64
}

impl SearchSpace {
    fn encode(&self, shape: &NigShape) -> [f64; 4] {
        let a = shape.a.clamp(MIN_SHAPE, 0.99 * MAX_SHAPE);
        let ratio = (shape.b / shape.a).clamp(-1.0 + 1e-12, 1.0 - 1e-12);

        [
            a.ln(),
            ratio.atanh(),
            (shape.loc - self.mean) / self.sd,
            (shape.scale / self.sd).max(10.0 * MIN_SCALE_RATIO).ln()
        ]
    }

    fn decode(&self, theta: &[f64]) -> Option<NigShape> {
        let a = theta[0].exp();
        if !(MIN_SHAPE..=MAX_SHAPE).contains(&a) || theta[3] < MIN_SCALE_RATIO.ln() {
            return None;
        }

        let shape = NigShape {
            a,
            b: a * theta[1].tanh(),
            loc: self.mean + self.sd * theta[2],
            scale: self.sd * theta[3].exp()
        };

        shape.is_valid().then_some(shape)
    }
}

struct SampleMoments {
    mean: f64,
    sd: f64,
    skewness: f64,
    excess_kurtosis: f64
}

impl SampleMoments {
    fn of(times: &[f64]) -> Self {
        let mean = times.iter().mean();
        let sd = times.iter().population_std_dev();

        let n = times.len() as f64;
        let (m3, m4) = times.iter().fold((0.0, 0.0), |(m3, m4), t| {
            let d = t - mean;
            (m3 + d.powi(3), m4 + d.powi(4))
        });
        let variance = sd * sd;

        SampleMoments {
            mean,
            sd,
            skewness: m3 / n / (variance * sd),
            excess_kurtosis: m4 / n / (variance * variance) - 3.0
        }
    }

    /// Method-of-moments estimate. For the standardised NIG
    /// `skew = 3ρ/√γ` and `kurt = 3(1 + 4ρ²)/γ` with `ρ = b/a`; solving both
    /// needs `3·kurt > 4·skew²`, otherwise a moderate-skew shape is used.
    fn initial_guess(&self) -> NigShape {
        let s = self.skewness;
        let k = self.excess_kurtosis;
        let denominator = 9.0 * k - 12.0 * s * s;

        let (rho, gamma) = if k > 0.0 && denominator > 0.0 {
            let rho_sq = (3.0 * s * s / denominator).min(MAX_SKEW_RATIO * MAX_SKEW_RATIO);
            (rho_sq.sqrt().copysign(s), 3.0 * (1.0 + 4.0 * rho_sq) / k)
        } else {
            ((s / 3.0).clamp(-MAX_SKEW_RATIO, MAX_SKEW_RATIO), 1.0)
        };

        let a = (gamma / (1.0 - rho * rho).sqrt()).clamp(MIN_SHAPE, 0.5 * MAX_SHAPE);
        let b = rho * a;
        let gamma = ((a - b.abs()) * (a + b.abs())).sqrt();
        let scale = self.sd * gamma.powf(1.5) / a;

        NigShape {
            a,
            b,
            loc: self.mean - scale * b / gamma,
            scale
        }
    }
}
