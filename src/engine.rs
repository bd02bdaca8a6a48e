use tracing::{debug, warn};

use crate::models::{AlgorithmConfig, AlgorithmType, ScoreSeries, WarningResult};
use crate::{anomaly, risk, similarity, trend};

const MIN_SENSITIVITY: f64 = 0.1;
const MAX_SENSITIVITY: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct StudentWarnings {
    pub student_id: String,
    pub name: String,
    pub class_name: String,
    pub warnings: Vec<WarningResult>,
}

impl StudentWarnings {
    pub fn peak_risk(&self) -> f64 {
        self.warnings
            .iter()
            .map(|warning| warning.risk_score)
            .fold(0.0, f64::max)
    }
}

/// Every total score recorded by students in the target's class.
fn class_scores(series: &ScoreSeries, population: &[ScoreSeries]) -> Vec<f64> {
    population
        .iter()
        .filter(|student| student.class_name == series.class_name)
        .flat_map(|student| student.exams.iter().map(|exam| exam.total_score))
        .collect()
}

fn dispatch(
    algorithm: AlgorithmType,
    series: &ScoreSeries,
    population: &[ScoreSeries],
) -> WarningResult {
    match algorithm {
        AlgorithmType::TrendPrediction => trend::predict_trend(series),
        AlgorithmType::AnomalyDetection => {
            anomaly::detect_anomalies(series, &class_scores(series, population))
        }
        AlgorithmType::RiskScore => risk::calculate_risk(series),
        AlgorithmType::SimilarStudents => similarity::find_similar_students(series, population),
    }
}

/// Runs the enabled algorithms in config order for one student.
pub fn run(
    series: &ScoreSeries,
    population: &[ScoreSeries],
    configs: &[AlgorithmConfig],
) -> Vec<WarningResult> {
    let mut results = Vec::new();

    for config in configs.iter().filter(|config| config.enabled) {
        let Some(algorithm) = config.algorithm() else {
            warn!(algorithm = %config.kind, "skipping unrecognized algorithm type");
            continue;
        };

        let mut result = dispatch(algorithm, series, population);
        let sensitivity = config.sensitivity.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY);
        if sensitivity != config.sensitivity {
            debug!(
                algorithm = algorithm.as_str(),
                configured = config.sensitivity,
                applied = sensitivity,
                "sensitivity outside supported range, clamped"
            );
        }
        result.risk_score *= sensitivity;

        if result.confidence < config.min_confidence {
            debug!(
                student_id = %series.student_id,
                algorithm = algorithm.as_str(),
                confidence = result.confidence,
                min_confidence = config.min_confidence,
                "dropping low-confidence result"
            );
            continue;
        }

        debug!(
            student_id = %series.student_id,
            algorithm = algorithm.as_str(),
            risk_score = result.risk_score,
            "warning produced"
        );
        results.push(result);
    }

    results
}

/// Runs every student in `population` against the rest of it.
pub fn run_cohort(population: &[ScoreSeries], configs: &[AlgorithmConfig]) -> Vec<StudentWarnings> {
    population
        .iter()
        .map(|series| StudentWarnings {
            student_id: series.student_id.clone(),
            name: series.name.clone(),
            class_name: series.class_name.clone(),
            warnings: run(series, population, configs),
        })
        .collect()
}
