use serde::{Deserialize, Serialize};

/// Shape, skewness, location and scale of a fitted
/// [normal-inverse Gaussian distribution][nig]. This is what seeds a warm-started fit.
///
/// [nig]: https://en.wikipedia.org/wiki/Normal-inverse_Gaussian_distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NigShape {
    pub a: f64,
    pub b: f64,
    pub loc: f64,
    pub scale: f64
}

impl NigShape {
    /// `a > 0`, `|b| < a`, `scale > 0` and everything finite.
    /// The all-zero tuple fails this check.
    pub fn is_valid(&self) -> bool {
        [self.a, self.b, self.loc, self.scale].iter().all(|v| v.is_finite())
            && self.a > 0.0
            && self.b.abs() < self.a
            && self.scale > 0.0
    }
}

/// A complete fit: the distribution plus `top_scale`, the survival
/// probability at the fastest time of the sample it was fitted on.
/// Replaced wholesale on every refit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionParameters {
    pub a: f64,
    pub b: f64,
    pub loc: f64,
    pub scale: f64,
    pub top_scale: f64
}

impl DistributionParameters {
    pub fn new(shape: NigShape, top_scale: f64) -> Self {
        DistributionParameters {
            a: shape.a,
            b: shape.b,
            loc: shape.loc,
            scale: shape.scale,
            top_scale
        }
    }

    pub fn shape(&self) -> NigShape {
        NigShape {
            a: self.a,
            b: self.b,
            loc: self.loc,
            scale: self.scale
        }
    }

    pub fn is_valid(&self) -> bool {
        self.shape().is_valid() && self.top_scale.is_finite() && self.top_scale > 0.0 && self.top_scale <= 1.0
    }
}
