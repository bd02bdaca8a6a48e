use std::fmt::Write;

use crate::engine::{self, StudentWarnings};
use crate::models::{AlgorithmConfig, AlgorithmType, ScoreSeries};
use crate::stats;

#[derive(Debug, Clone)]
pub struct AlgorithmSummary {
    pub algorithm: AlgorithmType,
    pub count: usize,
    pub avg_risk: f64,
}

pub fn summarize_by_algorithm(cohort: &[StudentWarnings]) -> Vec<AlgorithmSummary> {
    let mut summaries: Vec<AlgorithmSummary> = AlgorithmType::ALL
        .iter()
        .map(|algorithm| {
            let risks: Vec<f64> = cohort
                .iter()
                .flat_map(|student| student.warnings.iter())
                .filter(|warning| warning.algorithm_type() == *algorithm)
                .map(|warning| warning.risk_score)
                .collect();
            AlgorithmSummary {
                algorithm: *algorithm,
                count: risks.len(),
                avg_risk: stats::mean(&risks),
            }
        })
        .filter(|summary| summary.count > 0)
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count));
    summaries
}

fn latest_scores(population: &[ScoreSeries]) -> Vec<(&str, f64)> {
    population
        .iter()
        .filter_map(|series| {
            series
                .chronological()
                .last()
                .map(|exam| (series.student_id.as_str(), exam.total_score))
        })
        .collect()
}

fn write_distribution(output: &mut String, population: &[ScoreSeries]) {
    let latest = latest_scores(population);
    let _ = writeln!(output, "## Latest Score Distribution");

    if latest.is_empty() {
        let _ = writeln!(output, "No scores recorded.");
        return;
    }

    let values: Vec<f64> = latest.iter().map(|(_, score)| *score).collect();
    let summary = stats::five_number_summary(&values);
    let shape = stats::analyze_distribution(&values);

    let _ = writeln!(
        output,
        "- min {:.1}, Q1 {:.1}, median {:.1}, Q3 {:.1}, max {:.1} (IQR {:.1})",
        summary.min, summary.q1, summary.median, summary.q3, summary.max, summary.iqr
    );
    let _ = writeln!(
        output,
        "- mean {:.1}, std dev {:.1}, skewness {:.2} ({})",
        shape.mean,
        shape.std_dev,
        shape.skewness,
        if shape.is_normal { "roughly symmetric" } else { "skewed" }
    );

    let outliers = stats::detect_outliers_iqr(&values);
    if outliers.outlier_indices.is_empty() {
        let _ = writeln!(output, "- no IQR outliers");
    } else {
        for index in &outliers.outlier_indices {
            let (student_id, score) = latest[*index];
            let _ = writeln!(
                output,
                "- IQR outlier: {student_id} at {score:.1} (normal range {:.1} to {:.1})",
                outliers.lower_bound, outliers.upper_bound
            );
        }
    }

    let anomalies = stats::detect_anomalies_z_score(&values, stats::DEFAULT_Z_THRESHOLD);
    for (anomaly, (student_id, _)) in anomalies.iter().zip(&latest) {
        if anomaly.is_anomaly {
            let _ = writeln!(
                output,
                "- z-score anomaly: {student_id} at {:.1} (z {:.2}, {:?}, percentile {:.0})",
                anomaly.value, anomaly.z_score, anomaly.severity, anomaly.percentile
            );
        }
    }
}

pub fn build_report(population: &[ScoreSeries], configs: &[AlgorithmConfig]) -> String {
    let cohort = engine::run_cohort(population, configs);
    let summaries = summarize_by_algorithm(&cohort);

    let mut output = String::new();

    let _ = writeln!(output, "# Cohort Risk Report");
    let _ = writeln!(output, "Generated for {} students", population.len());
    let _ = writeln!(output);
    write_distribution(&mut output, population);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Warning Mix");
    if summaries.is_empty() {
        let _ = writeln!(output, "No warnings produced.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} warnings (avg risk {:.1})",
                summary.algorithm.as_str(),
                summary.count,
                summary.avg_risk
            );
        }
    }

    let mut ranked: Vec<&StudentWarnings> = cohort
        .iter()
        .filter(|student| !student.warnings.is_empty())
        .collect();
    ranked.sort_by(|a, b| b.peak_risk().total_cmp(&a.peak_risk()));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Students");
    if ranked.is_empty() {
        let _ = writeln!(output, "No students with warnings.");
    } else {
        for student in ranked.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} ({}, {}) peak risk {:.1} across {} warnings",
                student.name,
                student.student_id,
                student.class_name,
                student.peak_risk(),
                student.warnings.len()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Warning Details");
    for student in ranked.iter() {
        let _ = writeln!(output, "### {} ({})", student.name, student.student_id);
        for warning in &student.warnings {
            let _ = writeln!(
                output,
                "- [{}] risk {:.1}, confidence {:.2}: {}",
                warning.algorithm_type().as_str(),
                warning.risk_score,
                warning.confidence,
                warning.explanation
            );
            if let Some(cases) = warning.similar_cases() {
                if !cases.is_empty() {
                    let _ = writeln!(output, "  - similar students: {}", cases.join(", "));
                }
            }
        }
    }

    output
}
