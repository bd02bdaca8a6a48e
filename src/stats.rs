use crate::models::{
    AnomalyResult, DistributionSummary, FiveNumberSummary, OutlierDetectionResult, OutlierMethod,
    Severity, TrendDirection, TrendSummary,
};

pub const DEFAULT_Z_THRESHOLD: f64 = 2.0;
const STABLE_SLOPE: f64 = 0.01;

/// Least-squares fit of value against position `0..n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
pub fn standard_deviation(values: &[f64]) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }
    let avg = mean(values);
    let squared: f64 = values.iter().map(|value| (value - avg).powi(2)).sum();
    (squared / (values.len() - 1) as f64).sqrt()
}

/// Population standard deviation (n denominator), 0 for empty input.
pub fn population_standard_deviation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let squared: f64 = values.iter().map(|value| (value - avg).powi(2)).sum();
    (squared / values.len() as f64).sqrt()
}

pub fn z_score(value: f64, population: &[f64]) -> f64 {
    let std_dev = standard_deviation(population);
    if std_dev == 0.0 {
        return 0.0;
    }
    (value - mean(population)) / std_dev
}

/// Coefficient of variation, 0 when the mean is 0.
pub fn variation_ratio(values: &[f64]) -> f64 {
    let avg = mean(values);
    if avg == 0.0 {
        return 0.0;
    }
    standard_deviation(values) / avg
}

fn severity_for(z: f64) -> Severity {
    let magnitude = z.abs();
    if magnitude > 3.0 {
        Severity::Severe
    } else if magnitude > 2.5 {
        Severity::Moderate
    } else {
        Severity::Mild
    }
}

/// Scores every value against the whole slice, itself included.
pub fn detect_anomalies_z_score(values: &[f64], threshold: f64) -> Vec<AnomalyResult> {
    let avg = mean(values);
    let std_dev = standard_deviation(values);
    let count = values.len() as f64;

    values
        .iter()
        .map(|&value| {
            let z = if std_dev == 0.0 {
                0.0
            } else {
                (value - avg) / std_dev
            };
            let below = values.iter().filter(|other| **other < value).count() as f64;
            AnomalyResult {
                value,
                z_score: z,
                is_anomaly: z.abs() > threshold,
                severity: severity_for(z),
                percentile: below / count * 100.0,
            }
        })
        .collect()
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

// Index-based quartiles, no interpolation.
fn quartiles(sorted: &[f64]) -> (f64, f64) {
    let n = sorted.len() as f64;
    let q1 = sorted[(n * 0.25).floor() as usize];
    let q3 = sorted[(n * 0.75).floor() as usize];
    (q1, q3)
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

pub fn median(values: &[f64]) -> f64 {
    median_of_sorted(&sorted_copy(values))
}

pub fn detect_outliers_iqr(values: &[f64]) -> OutlierDetectionResult {
    if values.is_empty() {
        return OutlierDetectionResult {
            lower_bound: 0.0,
            upper_bound: 0.0,
            outliers: Vec::new(),
            outlier_indices: Vec::new(),
            method: OutlierMethod::Iqr,
        };
    }

    let sorted = sorted_copy(values);
    let (q1, q3) = quartiles(&sorted);
    let iqr = q3 - q1;
    let lower_bound = q1 - 1.5 * iqr;
    let upper_bound = q3 + 1.5 * iqr;

    let mut outliers = Vec::new();
    let mut outlier_indices = Vec::new();
    for (index, &value) in values.iter().enumerate() {
        if value < lower_bound || value > upper_bound {
            outliers.push(value);
            outlier_indices.push(index);
        }
    }

    OutlierDetectionResult {
        lower_bound,
        upper_bound,
        outliers,
        outlier_indices,
        method: OutlierMethod::Iqr,
    }
}

pub fn five_number_summary(values: &[f64]) -> FiveNumberSummary {
    if values.is_empty() {
        return FiveNumberSummary {
            min: 0.0,
            q1: 0.0,
            median: 0.0,
            q3: 0.0,
            max: 0.0,
            iqr: 0.0,
        };
    }

    let sorted = sorted_copy(values);
    let (q1, q3) = quartiles(&sorted);
    FiveNumberSummary {
        min: sorted[0],
        q1,
        median: median_of_sorted(&sorted),
        q3,
        max: sorted[sorted.len() - 1],
        iqr: q3 - q1,
    }
}

/// Most frequent value; the earliest one wins a tie. `None` when no value repeats.
fn mode(values: &[f64]) -> Option<f64> {
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for &value in values {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some(entry) => entry.1 += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(f64, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((value, count));
        }
    }

    match best {
        Some((value, count)) if count > 1 => Some(value),
        _ => None,
    }
}

pub fn analyze_distribution(values: &[f64]) -> DistributionSummary {
    let avg = mean(values);
    let mid = median(values);
    let std_dev = standard_deviation(values);
    let divisor = if std_dev == 0.0 { 1.0 } else { std_dev };
    let skewness = (avg - mid) / divisor;

    DistributionSummary {
        mean: avg,
        median: mid,
        std_dev,
        skewness,
        is_normal: skewness.abs() < 0.5,
        mode: mode(values),
    }
}

pub fn linear_regression(values: &[f64]) -> Regression {
    let n = values.len() as f64;
    if values.len() < 2 {
        return Regression {
            slope: 0.0,
            intercept: values.first().copied().unwrap_or(0.0),
            r_squared: 0.0,
        };
    }

    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    for (index, &y) in values.iter().enumerate() {
        let x = index as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    let denominator = n * sum_xx - sum_x * sum_x;
    let slope = if denominator == 0.0 {
        0.0
    } else {
        (n * sum_xy - sum_x * sum_y) / denominator
    };
    let intercept = (sum_y - slope * sum_x) / n;

    let avg = sum_y / n;
    let total: f64 = values.iter().map(|y| (y - avg).powi(2)).sum();
    let residual: f64 = values
        .iter()
        .enumerate()
        .map(|(index, y)| (y - (slope * index as f64 + intercept)).powi(2))
        .sum();
    let r_squared = if total == 0.0 {
        0.0
    } else {
        1.0 - residual / total
    };

    Regression {
        slope,
        intercept,
        r_squared,
    }
}

pub fn detect_trend(values: &[f64]) -> TrendSummary {
    if values.len() < 2 {
        return TrendSummary {
            direction: TrendDirection::Stable,
            slope: 0.0,
            confidence: 0.0,
        };
    }

    let fit = linear_regression(values);
    let direction = if fit.slope.abs() < STABLE_SLOPE {
        TrendDirection::Stable
    } else if fit.slope > 0.0 {
        TrendDirection::Up
    } else {
        TrendDirection::Down
    };

    TrendSummary {
        direction,
        slope: fit.slope,
        confidence: fit.r_squared.clamp(0.0, 1.0),
    }
}
