//! Pure statistics for pairwise correlation analysis.
//!
//! Alignment, the Pearson coefficient, and the two-sided p-value are all
//! deterministic functions of their inputs: re-running them on frozen
//! series yields bit-identical results.

use serde::{Deserialize, Serialize};

/// One sample of a fetched time series.
///
/// Timestamps are kept as integer milliseconds so that alignment is an
/// exact intersection rather than a float comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp_ms: i64,
    pub value: f64,
}

impl MetricSample {
    pub fn new(timestamp_ms: i64, value: f64) -> Self {
        Self {
            timestamp_ms,
            value,
        }
    }
}

/// Result of analyzing one aligned metric pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairStats {
    /// Pearson coefficient in [-1, 1]
    pub coefficient: f64,
    /// Two-sided p-value in [0, 1]
    pub p_value: f64,
    /// Number of aligned samples the statistics were computed from
    pub sample_size: usize,
}

/// Align two series by exact-timestamp intersection.
///
/// Returns value arrays of equal length ordered by ascending timestamp.
/// Input order does not matter; duplicate timestamps within one series
/// keep the last value seen.
pub fn align_series(a: &[MetricSample], b: &[MetricSample]) -> (Vec<f64>, Vec<f64>) {
    use std::collections::BTreeMap;

    let map_a: BTreeMap<i64, f64> = a.iter().map(|s| (s.timestamp_ms, s.value)).collect();
    let map_b: BTreeMap<i64, f64> = b.iter().map(|s| (s.timestamp_ms, s.value)).collect();

    let mut values_a = Vec::new();
    let mut values_b = Vec::new();
    for (ts, va) in &map_a {
        if let Some(vb) = map_b.get(ts) {
            values_a.push(*va);
            values_b.push(*vb);
        }
    }
    (values_a, values_b)
}

/// Pearson coefficient of two equal-length value arrays.
///
/// Returns `None` when the correlation is undefined: fewer than 3
/// samples, or either series has (near-)zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 3 {
        return None;
    }

    let mean_x: f64 = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y: f64 = y[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..n {
        let dx = x[i] - mean_x;
        let dy = y[i] - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom < 1e-12 {
        return None;
    }

    // Floating-point roundoff can push |r| marginally past 1
    Some((cov / denom).clamp(-1.0, 1.0))
}

/// Two-sided p-value for a Pearson coefficient under the null hypothesis
/// of no correlation, via the exact Student's t relationship:
/// t = r * sqrt(df / (1 - r^2)) with df = n - 2, and
/// p = I_{df/(df+t^2)}(df/2, 1/2).
pub fn p_value(r: f64, n: usize) -> f64 {
    if n < 3 {
        return 1.0;
    }
    let df = (n - 2) as f64;
    let r2 = r * r;
    if 1.0 - r2 < 1e-12 {
        // |r| = 1: the t statistic diverges
        return 0.0;
    }
    let t2 = r2 * df / (1.0 - r2);
    regularized_incomplete_beta(df / 2.0, 0.5, df / (df + t2)).clamp(0.0, 1.0)
}

/// Full pairwise analysis of two aligned value arrays.
///
/// `None` when the correlation is undefined (constant series or too few
/// samples); callers treat that as a rejected pair, not an error.
pub fn pairwise_stats(x: &[f64], y: &[f64]) -> Option<PairStats> {
    let n = x.len().min(y.len());
    let coefficient = pearson(&x[..n], &y[..n])?;
    Some(PairStats {
        coefficient,
        p_value: p_value(coefficient, n),
        sample_size: n,
    })
}

/// ln(Gamma(x)) via the Lanczos approximation, x > 0
fn ln_gamma(x: f64) -> f64 {
    const COEF: [f64; 6] = [
        76.180_091_729_471_46,
        -86.505_320_329_416_77,
        24.014_098_240_830_91,
        -1.231_739_572_450_155,
        0.120_865_097_386_617_9e-2,
        -0.539_523_938_495_3e-5,
    ];

    let mut y = x;
    let tmp = x + 5.5;
    let tmp = tmp - (x + 0.5) * tmp.ln();
    let mut ser = 1.000_000_000_190_015;
    for c in COEF {
        y += 1.0;
        ser += c / y;
    }
    -tmp + (2.506_628_274_631_000_5 * ser / x).ln()
}

/// Continued-fraction evaluation for the incomplete beta function
/// (modified Lentz's method)
fn beta_cf(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 200;
    const EPS: f64 = 3.0e-12;
    const FPMIN: f64 = 1.0e-30;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < FPMIN {
        d = FPMIN;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        let del = d * c;
        h *= del;

        if (del - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// Regularized incomplete beta function I_x(a, b)
fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_bt = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let bt = ln_bt.exp();

    if x < (a + 1.0) / (a + b + 2.0) {
        bt * beta_cf(a, b, x) / a
    } else {
        1.0 - bt * beta_cf(b, a, 1.0 - x) / b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(points: &[(i64, f64)]) -> Vec<MetricSample> {
        points
            .iter()
            .map(|(ts, v)| MetricSample::new(*ts, *v))
            .collect()
    }

    #[test]
    fn perfect_positive_correlation() {
        // X=[1..5], Y=2X at 60s intervals
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 6.0, 8.0, 10.0];
        let stats = pairwise_stats(&x, &y).unwrap();
        assert_eq!(stats.coefficient, 1.0);
        assert!(stats.p_value < 1e-9);
        assert_eq!(stats.sample_size, 5);
    }

    #[test]
    fn perfect_negative_correlation() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [10.0, 8.0, 6.0, 4.0, 2.0];
        let stats = pairwise_stats(&x, &y).unwrap();
        assert_eq!(stats.coefficient, -1.0);
        assert!(stats.p_value < 1e-9);
    }

    #[test]
    fn constant_series_is_undefined() {
        let x = [1.0, 1.0, 1.0, 1.0, 1.0];
        let y = [2.0, 4.0, 3.0, 5.0, 1.0];
        assert!(pairwise_stats(&x, &y).is_none());
        assert!(pairwise_stats(&y, &x).is_none());
    }

    #[test]
    fn too_few_samples_is_undefined() {
        assert!(pairwise_stats(&[1.0, 2.0], &[2.0, 4.0]).is_none());
    }

    #[test]
    fn pearson_is_symmetric() {
        let x = [1.0, 3.0, 2.0, 5.0, 4.0, 7.0];
        let y = [2.0, 2.5, 3.0, 4.5, 5.0, 6.0];
        assert_eq!(pearson(&x, &y), pearson(&y, &x));
    }

    #[test]
    fn analysis_is_idempotent() {
        let x = [1.2, 3.4, 2.2, 5.9, 4.1, 7.7, 6.0, 8.3];
        let y = [0.9, 2.8, 2.5, 5.1, 3.9, 7.2, 6.3, 8.0];
        let first = pairwise_stats(&x, &y).unwrap();
        let second = pairwise_stats(&x, &y).unwrap();
        assert_eq!(first.coefficient.to_bits(), second.coefficient.to_bits());
        assert_eq!(first.p_value.to_bits(), second.p_value.to_bits());
        assert_eq!(first.sample_size, second.sample_size);
    }

    #[test]
    fn p_value_bounds_and_ordering() {
        // Stronger correlations at equal n yield smaller p-values
        let p_strong = p_value(0.95, 20);
        let p_weak = p_value(0.2, 20);
        assert!((0.0..=1.0).contains(&p_strong));
        assert!((0.0..=1.0).contains(&p_weak));
        assert!(p_strong < 0.001);
        assert!(p_weak > 0.1);
        assert!(p_strong < p_weak);
        // Sign does not matter for a two-sided test
        assert_eq!(p_value(0.7, 12).to_bits(), p_value(-0.7, 12).to_bits());
    }

    #[test]
    fn alignment_is_exact_ascending_intersection() {
        let a = series(&[(300, 3.0), (100, 1.0), (200, 2.0), (400, 4.0)]);
        let b = series(&[(200, 20.0), (400, 40.0), (500, 50.0), (100, 10.0)]);
        let (va, vb) = align_series(&a, &b);
        assert_eq!(va, vec![1.0, 2.0, 4.0]);
        assert_eq!(vb, vec![10.0, 20.0, 40.0]);
        assert_eq!(va.len(), vb.len());
    }

    #[test]
    fn alignment_with_no_overlap_is_empty() {
        let a = series(&[(100, 1.0), (200, 2.0)]);
        let b = series(&[(300, 3.0), (400, 4.0)]);
        let (va, vb) = align_series(&a, &b);
        assert!(va.is_empty());
        assert!(vb.is_empty());
    }

    #[test]
    fn incomplete_beta_endpoints() {
        assert_eq!(regularized_incomplete_beta(2.0, 3.0, 0.0), 0.0);
        assert_eq!(regularized_incomplete_beta(2.0, 3.0, 1.0), 1.0);
        // I_x(1, 1) is the uniform CDF
        let mid = regularized_incomplete_beta(1.0, 1.0, 0.5);
        assert!((mid - 0.5).abs() < 1e-9);
    }
}
