//! Standard normal CDF and its logarithm

use std::f64::consts::{LN_2, SQRT_2};

/// `ln erfc(x)` for `x >= 0`
///
/// Chebyshev fit with fractional error below 1.2e-7 everywhere; the
/// `-x^2` term stays outside the exponential so the far tail does not
/// underflow.
fn ln_erfc_nonneg(x: f64) -> f64 {
    let t = 1.0 / (1.0 + 0.5 * x);
    let poly = -1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98 + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    t.ln() - x * x + poly
}

/// Complementary error function
pub fn erfc(x: f64) -> f64 {
    if x >= 0.0 {
        ln_erfc_nonneg(x).exp()
    } else {
        2.0 - ln_erfc_nonneg(-x).exp()
    }
}

/// `Phi(z)`, the standard normal CDF
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / SQRT_2)
}

/// `ln Phi(z)`, finite far into the lower tail
pub fn log_normal_cdf(z: f64) -> f64 {
    if z < 0.0 {
        ln_erfc_nonneg(-z / SQRT_2) - LN_2
    } else {
        (-0.5 * erfc(z / SQRT_2)).ln_1p()
    }
}
