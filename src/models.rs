use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamRecord {
    pub exam_title: String,
    pub exam_date: NaiveDate,
    pub total_score: f64,
    #[serde(default)]
    pub rank_in_class: Option<i32>,
    #[serde(default)]
    pub rank_in_school: Option<i32>,
    #[serde(default)]
    pub subject_scores: BTreeMap<String, f64>,
}

/// One student's exam history as handed over by the grade store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSeries {
    pub student_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub exams: Vec<ExamRecord>,
}

impl ScoreSeries {
    /// Exams in ascending date order. Stable, so same-day exams keep their
    /// input order. The snapshot itself is left untouched.
    pub fn chronological(&self) -> Vec<&ExamRecord> {
        let mut exams: Vec<&ExamRecord> = self.exams.iter().collect();
        exams.sort_by_key(|exam| exam.exam_date);
        exams
    }

    pub fn total_scores(&self) -> Vec<f64> {
        self.chronological()
            .iter()
            .map(|exam| exam.total_score)
            .collect()
    }

    /// Class ranks in date order, skipping missing and non-positive entries.
    pub fn class_ranks(&self) -> Vec<i32> {
        self.chronological()
            .iter()
            .filter_map(|exam| exam.rank_in_class)
            .filter(|rank| *rank > 0)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmType {
    TrendPrediction,
    AnomalyDetection,
    RiskScore,
    SimilarStudents,
}

impl AlgorithmType {
    pub const ALL: [AlgorithmType; 4] = [
        AlgorithmType::TrendPrediction,
        AlgorithmType::AnomalyDetection,
        AlgorithmType::RiskScore,
        AlgorithmType::SimilarStudents,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "trend_prediction" => Some(AlgorithmType::TrendPrediction),
            "anomaly_detection" => Some(AlgorithmType::AnomalyDetection),
            "risk_score" => Some(AlgorithmType::RiskScore),
            "similar_students" => Some(AlgorithmType::SimilarStudents),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlgorithmType::TrendPrediction => "trend_prediction",
            AlgorithmType::AnomalyDetection => "anomaly_detection",
            AlgorithmType::RiskScore => "risk_score",
            AlgorithmType::SimilarStudents => "similar_students",
        }
    }
}

/// Per-call switch for one algorithm. `kind` stays a raw string so a
/// config naming an unknown algorithm still loads and is skipped later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub enabled: bool,
    pub sensitivity: f64,
    pub min_confidence: f64,
}

impl AlgorithmConfig {
    pub fn new(kind: AlgorithmType) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            enabled: true,
            sensitivity: 1.0,
            min_confidence: 0.0,
        }
    }

    pub fn defaults() -> Vec<Self> {
        AlgorithmType::ALL.iter().copied().map(Self::new).collect()
    }

    pub fn algorithm(&self) -> Option<AlgorithmType> {
        AlgorithmType::parse(&self.kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub value: f64,
    pub z_score: f64,
    pub is_anomaly: bool,
    pub severity: Severity,
    pub percentile: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    Iqr,
    Zscore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierDetectionResult {
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub outliers: Vec<f64>,
    pub outlier_indices: Vec<usize>,
    pub method: OutlierMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiveNumberSummary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub iqr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub skewness: f64,
    pub is_normal: bool,
    pub mode: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub direction: TrendDirection,
    pub slope: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskFactors {
    pub level: f64,
    pub volatility: f64,
    pub rank: f64,
    pub balance: f64,
}

/// Algorithm-specific payload; `algorithm_type` is the discriminant on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm_type", rename_all = "snake_case")]
pub enum WarningDetail {
    TrendPrediction {
        exam_count: usize,
        slope: Option<f64>,
        predicted_next: Option<f64>,
    },
    AnomalyDetection {
        latest_score: Option<f64>,
        personal_mean: Option<f64>,
        z_score: Option<f64>,
    },
    RiskScore {
        factors: Option<RiskFactors>,
    },
    SimilarStudents {
        similar_cases: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningResult {
    pub student_id: String,
    pub risk_score: f64,
    pub confidence: f64,
    pub explanation: String,
    pub recommended_actions: Vec<String>,
    #[serde(flatten)]
    pub detail: WarningDetail,
}

impl WarningResult {
    pub fn algorithm_type(&self) -> AlgorithmType {
        match self.detail {
            WarningDetail::TrendPrediction { .. } => AlgorithmType::TrendPrediction,
            WarningDetail::AnomalyDetection { .. } => AlgorithmType::AnomalyDetection,
            WarningDetail::RiskScore { .. } => AlgorithmType::RiskScore,
            WarningDetail::SimilarStudents { .. } => AlgorithmType::SimilarStudents,
        }
    }

    pub fn similar_cases(&self) -> Option<&[String]> {
        match &self.detail {
            WarningDetail::SimilarStudents { similar_cases } => Some(similar_cases),
            _ => None,
        }
    }
}

pub(crate) fn actions(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn chronological_sorts_without_mutating() {
        let mut series = series("s1", &[10.0, 20.0, 30.0]);
        series.exams.swap(0, 2);
        let ordered: Vec<f64> = series.chronological().iter().map(|e| e.total_score).collect();
        assert_eq!(ordered, vec![10.0, 20.0, 30.0]);
        assert_eq!(series.exams[0].total_score, 30.0);
    }

    #[test]
    fn class_ranks_skip_missing_and_zero() {
        let mut series = ranked_series("s1", &[1.0, 2.0, 3.0], &[4, 0, 9]);
        series.exams.push(exam(20, 4.0, None));
        assert_eq!(series.class_ranks(), vec![4, 9]);
    }

    #[test]
    fn unknown_algorithm_name_still_loads() {
        let raw = r#"{"type":"neural_net","enabled":true,"sensitivity":0.5,"min_confidence":0.1}"#;
        let config: AlgorithmConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.kind, "neural_net");
        assert!(config.algorithm().is_none());
    }

    #[test]
    fn warning_serializes_with_algorithm_tag() {
        let result = WarningResult {
            student_id: "s1".to_string(),
            risk_score: 45.0,
            confidence: 0.7,
            explanation: "peers".to_string(),
            recommended_actions: vec![],
            detail: WarningDetail::SimilarStudents {
                similar_cases: vec!["s2".to_string()],
            },
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["algorithm_type"], "similar_students");
        assert_eq!(json["similar_cases"][0], "s2");
        assert_eq!(result.algorithm_type(), AlgorithmType::SimilarStudents);
    }
}
