//! Statistics over utilization series.

/// Median of the values, the mean of the two middle ones for an even count.
pub fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.;
    }
    let sorted = sorted(data);
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.
    }
}

/// Interquartile range with quartile positions `round(0.25 * (n + 1))` and `round(0.75 * (n + 1))`
/// (1-based) in the sorted data.
pub fn iqr(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.;
    }
    let sorted = sorted(data);
    let n = sorted.len() as f64;
    let q1 = quartile_index(0.25 * (n + 1.), sorted.len());
    let q3 = quartile_index(0.75 * (n + 1.), sorted.len());
    sorted[q3] - sorted[q1]
}

fn quartile_index(position: f64, len: usize) -> usize {
    (position.round() as usize).clamp(1, len) - 1
}

/// Length of the data without the trailing zeros.
pub fn count_non_zero_beginning(data: &[f64]) -> usize {
    data.iter().rposition(|&x| x != 0.).map_or(0, |i| i + 1)
}

/// Copy of the data without the trailing zeros.
pub fn trim_zero_tail(data: &[f64]) -> Vec<f64> {
    data[..count_non_zero_beginning(data)].to_vec()
}

/// Intercept and slope of the weighted least squares line, `None` if the weighted x values have no spread.
pub fn weighted_linear_regression(x: &[f64], y: &[f64], weights: &[f64]) -> Option<(f64, f64)> {
    let total_weight: f64 = weights.iter().sum();
    if total_weight <= 0. {
        return None;
    }
    let mean_x = x.iter().zip(weights).map(|(x, w)| x * w).sum::<f64>() / total_weight;
    let mean_y = y.iter().zip(weights).map(|(y, w)| y * w).sum::<f64>() / total_weight;
    let mut sxx = 0.;
    let mut sxy = 0.;
    for ((x, y), w) in x.iter().zip(y).zip(weights) {
        sxx += w * (x - mean_x) * (x - mean_x);
        sxy += w * (x - mean_x) * (y - mean_y);
    }
    if sxx <= 0. {
        return None;
    }
    let slope = sxy / sxx;
    Some((mean_y - slope * mean_x, slope))
}

/// Tricube weights over `n` points ordered in time, the oldest point gets zero weight.
fn tricube_weights(n: usize) -> Vec<f64> {
    let spread = (n.max(2) - 1) as f64;
    (0..n)
        .map(|i| {
            let d = (n - 1 - i) as f64 / spread;
            (1. - d * d * d).powi(3)
        })
        .collect()
}

/// Bisquare weights of residuals scaled by six median absolute residuals.
fn bisquare_weights(residuals: &[f64]) -> Vec<f64> {
    let abs: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
    let scale = 6. * median(&abs);
    if scale < 1e-12 {
        return vec![1.; residuals.len()];
    }
    residuals
        .iter()
        .map(|r| {
            let u = r / scale;
            if u.abs() < 1. {
                (1. - u * u).powi(2)
            } else {
                0.
            }
        })
        .collect()
}

fn loess(y: &[f64]) -> Option<(Vec<f64>, Vec<f64>, (f64, f64))> {
    if y.len() < 2 {
        return None;
    }
    let x: Vec<f64> = (1..=y.len()).map(|i| i as f64).collect();
    let weights = tricube_weights(y.len());
    let fit = weighted_linear_regression(&x, y, &weights)?;
    Some((x, weights, fit))
}

/// Robust local regression over the series placed at `x = 1..=n` (oldest first).
///
/// The tricube fit is refitted once with residual bisquare weights, which damps outliers.
/// Returns intercept and slope.
pub fn robust_loess(y: &[f64]) -> Option<(f64, f64)> {
    let (x, tricube, (intercept, slope)) = loess(y)?;
    let residuals: Vec<f64> = x.iter().zip(y).map(|(x, y)| y - (intercept + slope * x)).collect();
    let weights: Vec<f64> = tricube
        .iter()
        .zip(bisquare_weights(&residuals))
        .map(|(t, b)| t * b)
        .collect();
    weighted_linear_regression(&x, y, &weights).or(Some((intercept, slope)))
}

fn sorted(data: &[f64]) -> Vec<f64> {
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        assert_eq!(median(&[3., 1., 2.]), 2.);
        assert_eq!(median(&[4., 1., 2., 3.]), 2.5);
        assert_eq!(median(&[]), 0.);
    }

    #[test]
    fn test_iqr() {
        // n = 7: quartiles are the 2nd and 6th values
        let data = [7., 1., 3., 5., 2., 6., 4.];
        assert_eq!(iqr(&data), 4.);
        assert_eq!(iqr(&[0.5]), 0.);
    }

    #[test]
    fn test_count_non_zero_beginning() {
        assert_eq!(count_non_zero_beginning(&[0.1, 0.2, 0., 0.3, 0., 0.]), 4);
        assert_eq!(count_non_zero_beginning(&[0., 0.]), 0);
        assert_eq!(count_non_zero_beginning(&[]), 0);
        assert_eq!(trim_zero_tail(&[0.5, 0., 0.]), vec![0.5]);
    }

    #[test]
    fn test_robust_loess() {
        let line: Vec<f64> = (1..=10).map(|i| 0.2 + 0.05 * i as f64).collect();
        let (intercept, slope) = robust_loess(&line).unwrap();
        assert!((intercept - 0.2).abs() < 1e-9);
        assert!((slope - 0.05).abs() < 1e-9);

        let mut spiky = vec![0.5; 10];
        spiky[5] = 0.9;
        let (_, _, (_, plain_slope)) = loess(&spiky).unwrap();
        let (_, robust_slope) = robust_loess(&spiky).unwrap();
        assert!(robust_slope.abs() < plain_slope.abs());

        assert_eq!(robust_loess(&[0.5]), None);
        assert_eq!(weighted_linear_regression(&[1., 1.], &[0., 1.], &[1., 1.]), None);
    }
}
