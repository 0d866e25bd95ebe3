use super::{
    constants::{SF_MAX_DEPTH, SF_MAX_SEGMENTS, SF_TAIL_CUTOFF, SF_TOLERANCE},
    structures::distribution_parameters::NigShape
};
use crate::error::{PointsError, PointsResult};
use std::f64::consts::PI;

const GOLDEN: f64 = 0.618_033_988_749_894_9;
const MODE_MAX_ITERATIONS: usize = 500;

// Gauss-Kronrod 7/15 abscissae and weights
const XGK: [f64; 8] = [
    0.991_455_371_120_812_6,
    0.949_107_912_342_758_5,
    0.864_864_423_359_769_1,
    0.741_531_185_599_394_4,
    0.586_087_235_467_691_1,
    0.405_845_151_377_397_2,
    0.207_784_955_007_898_5,
    0.0
];
const WGK: [f64; 8] = [
    0.022_935_322_010_529_22,
    0.063_092_092_629_978_55,
    0.104_790_010_322_250_2,
    0.140_653_259_715_525_9,
    0.169_004_726_639_267_9,
    0.190_350_578_064_785_4,
    0.204_432_940_075_298_9,
    0.209_482_141_084_727_8
];
const WG: [f64; 4] = [
    0.129_484_966_168_869_7,
    0.279_705_391_489_276_7,
    0.381_830_050_505_118_9,
    0.417_959_183_673_469_4
];

/// [Normal-inverse Gaussian distribution][nig] with the `(a, b, loc, scale)`
/// parameterisation, i.e. `a = αδ`, `b = βδ` on the variable standardised by
/// `loc` and `scale`.
///
/// Construction locates the mode and integrates the density once on each side
/// of it, so survival probabilities can be computed from whichever tail is
/// monotone. This keeps `sf` accurate close to 1 (fast times) as well as
/// close to 0 (slow times).
///
/// [nig]: https://en.wikipedia.org/wiki/Normal-inverse_Gaussian_distribution
#[derive(Debug, Clone, Copy)]
pub struct NormalInverseGaussian {
    shape: NigShape,
    gamma: f64,
    mode: f64,
    initial_step: f64,
    left_mass: f64,
    total_mass: f64
}

impl NormalInverseGaussian {
    pub fn new(shape: NigShape) -> PointsResult<Self> {
        if !shape.is_valid() {
            return Err(PointsError::InvalidArgument(format!(
                "invalid distribution parameters a={} b={} loc={} scale={}",
                shape.a, shape.b, shape.loc, shape.scale
            )));
        }

        let gamma = gamma(shape.a, shape.b);
        let mut dist = NormalInverseGaussian {
            shape,
            gamma,
            mode: 0.0,
            initial_step: 1.0,
            left_mass: 0.0,
            total_mass: 1.0
        };

        dist.mode = dist.find_mode();

        // Width of the peak from the curvature of the log-density at the mode
        let spread = (1.0 + dist.mode * dist.mode).powf(0.75) / shape.a.sqrt();
        dist.initial_step = 0.5 * spread.max(1e-12);

        dist.left_mass = dist.tail_mass(dist.mode, -1.0);
        dist.total_mass = dist.left_mass + dist.tail_mass(dist.mode, 1.0);

        if !dist.total_mass.is_finite() || dist.total_mass <= 0.0 {
            return Err(PointsError::InvalidArgument(format!(
                "distribution a={} b={} loc={} scale={} has no usable density",
                shape.a, shape.b, shape.loc, shape.scale
            )));
        }

        Ok(dist)
    }

    pub fn shape(&self) -> NigShape {
        self.shape
    }

    pub fn mean(&self) -> f64 {
        self.shape.loc + self.shape.scale * self.shape.b / self.gamma
    }

    pub fn variance(&self) -> f64 {
        self.shape.scale * self.shape.scale * self.shape.a * self.shape.a / self.gamma.powi(3)
    }

    /// Location of the density's peak
    pub fn mode(&self) -> f64 {
        self.shape.loc + self.shape.scale * self.mode
    }

    pub fn ln_pdf(&self, t: f64) -> f64 {
        self.ln_pdf_standardized(self.standardize(t)) - self.shape.scale.ln()
    }

    pub fn pdf(&self, t: f64) -> f64 {
        self.ln_pdf(t).exp()
    }

    /// Probability of a time slower than `t`.
    pub fn sf(&self, t: f64) -> f64 {
        let x = self.standardize(t);

        let sf = if x >= self.mode {
            self.tail_mass(x, 1.0) / self.total_mass
        } else {
            1.0 - self.tail_mass(x, -1.0) / self.total_mass
        };

        sf.clamp(0.0, 1.0)
    }

    pub fn cdf(&self, t: f64) -> f64 {
        1.0 - self.sf(t)
    }

    fn standardize(&self, t: f64) -> f64 {
        (t - self.shape.loc) / self.shape.scale
    }

    fn ln_pdf_standardized(&self, x: f64) -> f64 {
        ln_pdf_standardized(self.shape.a, self.shape.b, self.gamma, x)
    }

    fn pdf_standardized(&self, x: f64) -> f64 {
        self.ln_pdf_standardized(x).exp()
    }

    /// Golden-section search on the log-density, which is unimodal.
    fn find_mode(&self) -> f64 {
        let mean = self.shape.b / self.gamma;
        let sd = self.shape.a / self.gamma.powf(1.5);

        let mut lo = mean.min(0.0) - 2.0 * sd - 1.0;
        let mut hi = mean.max(0.0) + 2.0 * sd + 1.0;
        let mut x1 = hi - GOLDEN * (hi - lo);
        let mut x2 = lo + GOLDEN * (hi - lo);
        let mut f1 = self.ln_pdf_standardized(x1);
        let mut f2 = self.ln_pdf_standardized(x2);

        for _ in 0..MODE_MAX_ITERATIONS {
            if hi - lo <= 1e-10 * (1.0 + lo.abs().max(hi.abs())) {
                break;
            }

            if f1 < f2 {
                lo = x1;
                x1 = x2;
                f1 = f2;
                x2 = lo + GOLDEN * (hi - lo);
                f2 = self.ln_pdf_standardized(x2);
            } else {
                hi = x2;
                x2 = x1;
                f2 = f1;
                x1 = hi - GOLDEN * (hi - lo);
                f1 = self.ln_pdf_standardized(x1);
            }
        }

        0.5 * (lo + hi)
    }

    /// Integral of the standardised density from `from` to infinity in
    /// `direction` (+1 right tail, -1 left tail). Segments double in width
    /// until they stop contributing.
    fn tail_mass(&self, from: f64, direction: f64) -> f64 {
        let f = |x: f64| self.pdf_standardized(x);
        let mut start = from;
        let mut width = self.initial_step;
        let mut total = 0.0;

        for _ in 0..SF_MAX_SEGMENTS {
            let end = start + direction * width;
            let piece = if direction > 0.0 {
                integrate(&f, start, end)
            } else {
                integrate(&f, end, start)
            };

            total += piece;
            if !(piece > SF_TAIL_CUTOFF * total) {
                break;
            }

            start = end;
            width *= 2.0;
        }

        total
    }
}

/// `√(a² - b²)`
fn gamma(a: f64, b: f64) -> f64 {
    ((a - b.abs()) * (a + b.abs())).sqrt()
}

fn ln_pdf_standardized(a: f64, b: f64, gamma: f64, x: f64) -> f64 {
    let s = 1f64.hypot(x);
    let skew = b.abs();

    // -a·s + b·x, using s - |x| = 1 / (s + |x|) when the two terms would cancel
    let away = if b * x > 0.0 { 1.0 / (s + x.abs()) } else { s + x.abs() };
    let exponent = -(a - skew) * s - skew * away + gamma;

    a.ln() - PI.ln() - s.ln() + bessel_k1_scaled(a * s).ln() + exponent
}

/// Sum of log-densities of `times`, or `-inf` when the shape is not a valid
/// distribution. This is the objective maximised by the fitter.
pub fn log_likelihood(shape: &NigShape, times: &[f64]) -> f64 {
    if !shape.is_valid() {
        return f64::NEG_INFINITY;
    }

    let gamma = gamma(shape.a, shape.b);
    let ln_scale = shape.scale.ln();

    times
        .iter()
        .map(|t| ln_pdf_standardized(shape.a, shape.b, gamma, (t - shape.loc) / shape.scale) - ln_scale)
        .sum()
}

/// `K1(x)·eˣ`, the exponentially scaled modified Bessel function of the
/// second kind of order one (polynomial approximations, Abramowitz & Stegun 9.8).
fn bessel_k1_scaled(x: f64) -> f64 {
    if x <= 2.0 {
        let y = x * x / 4.0;
        let k1 = (x / 2.0).ln() * bessel_i1(x)
            + (1.0 / x)
                * (1.0
                    + y * (0.154_431_44
                        + y * (-0.672_785_79
                            + y * (-0.181_568_97 + y * (-0.019_194_02 + y * (-0.001_104_04 + y * (-0.000_046_86)))))));
        k1 * x.exp()
    } else {
        let y = 2.0 / x;
        (1.0 / x.sqrt())
            * (1.253_314_14
                + y * (0.234_986_19
                    + y * (-0.036_556_20
                        + y * (0.015_042_68 + y * (-0.007_803_53 + y * (0.003_256_14 + y * (-0.000_682_45)))))))
    }
}

/// Modified Bessel function of the first kind of order one, `|x| < 3.75`.
fn bessel_i1(x: f64) -> f64 {
    let t = (x / 3.75) * (x / 3.75);
    x * (0.5
        + t * (0.878_905_94
            + t * (0.514_988_69 + t * (0.150_849_34 + t * (0.026_587_33 + t * (0.003_015_32 + t * 0.000_324_11))))))
}

/// Adaptive Gauss-Kronrod quadrature with a tolerance relative to the first
/// estimate over the whole interval.
fn integrate<F: Fn(f64) -> f64>(f: &F, lo: f64, hi: f64) -> f64 {
    let (estimate, error) = gauss_kronrod(f, lo, hi);
    let tolerance = (SF_TOLERANCE * estimate.abs()).max(f64::MIN_POSITIVE);

    refine(f, lo, hi, estimate, error, tolerance, SF_MAX_DEPTH)
}

fn refine<F: Fn(f64) -> f64>(f: &F, lo: f64, hi: f64, estimate: f64, error: f64, tolerance: f64, depth: u32) -> f64 {
    if error <= tolerance || depth == 0 {
        return estimate;
    }

    let mid = 0.5 * (lo + hi);
    let (left, left_error) = gauss_kronrod(f, lo, mid);
    let (right, right_error) = gauss_kronrod(f, mid, hi);

    refine(f, lo, mid, left, left_error, 0.5 * tolerance, depth - 1)
        + refine(f, mid, hi, right, right_error, 0.5 * tolerance, depth - 1)
}

/// 15-point Kronrod estimate and its distance from the embedded 7-point Gauss rule.
fn gauss_kronrod<F: Fn(f64) -> f64>(f: &F, lo: f64, hi: f64) -> (f64, f64) {
    let center = 0.5 * (lo + hi);
    let half = 0.5 * (hi - lo);

    let fc = f(center);
    let mut kronrod = fc * WGK[7];
    let mut gauss = fc * WG[3];

    for j in 0..7 {
        let dx = half * XGK[j];
        let pair = f(center - dx) + f(center + dx);

        kronrod += WGK[j] * pair;
        if j % 2 == 1 {
            gauss += WG[j / 2] * pair;
        }
    }

    (kronrod * half, ((kronrod - gauss) * half).abs())
}
