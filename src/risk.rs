use crate::models::{actions, RiskFactors, ScoreSeries, WarningDetail, WarningResult};
use crate::stats;

const LEVEL_WEIGHT: f64 = 0.30;
const VOLATILITY_WEIGHT: f64 = 0.20;
const RANK_WEIGHT: f64 = 0.25;
const BALANCE_WEIGHT: f64 = 0.25;

pub fn level_risk(average_total: f64) -> f64 {
    match average_total {
        avg if avg < 200.0 => 80.0,
        avg if avg < 300.0 => 60.0,
        avg if avg < 400.0 => 40.0,
        _ => 20.0,
    }
}

pub fn volatility_risk(scores: &[f64]) -> f64 {
    (stats::variation_ratio(scores) * 200.0).min(80.0)
}

/// Positive `rank_change` means the student slid down the class list.
pub fn rank_risk(rank_change: i32) -> f64 {
    match rank_change {
        change if change > 5 => 70.0,
        change if change > 2 => 55.0,
        change if change < -2 => 35.0,
        _ => 45.0,
    }
}

pub fn balance_risk(subject_scores: &[f64]) -> f64 {
    (stats::variation_ratio(subject_scores) * 100.0).min(80.0)
}

pub fn weighted_total(factors: &RiskFactors) -> f64 {
    let total = factors.level * LEVEL_WEIGHT
        + factors.volatility * VOLATILITY_WEIGHT
        + factors.rank * RANK_WEIGHT
        + factors.balance * BALANCE_WEIGHT;
    total.clamp(0.0, 100.0)
}

pub fn calculate_risk(series: &ScoreSeries) -> WarningResult {
    let exams = series.chronological();
    if exams.is_empty() {
        return WarningResult {
            student_id: series.student_id.clone(),
            risk_score: 50.0,
            confidence: 0.1,
            explanation: "no grade data".to_string(),
            recommended_actions: actions(&["Collect baseline grade data"]),
            detail: WarningDetail::RiskScore { factors: None },
        };
    }

    let scores: Vec<f64> = exams.iter().map(|exam| exam.total_score).collect();
    let average = stats::mean(&scores);
    let mut notes = Vec::new();

    let level = level_risk(average);
    if level > 60.0 {
        notes.push(format!("low average score of {average:.0}"));
    }

    let volatility = volatility_risk(&scores);
    if volatility > 40.0 {
        notes.push(format!(
            "large score swings (standard deviation {:.1})",
            stats::standard_deviation(&scores)
        ));
    }

    let ranks = series.class_ranks();
    let rank = if ranks.len() >= 2 {
        let change = ranks[ranks.len() - 1] - ranks[0];
        if change > 3 {
            notes.push(format!("class rank dropped {change} places"));
        }
        rank_risk(change)
    } else {
        50.0
    };

    // Only the earliest exam's subjects are read, not the whole series.
    // Left as found; aggregating across exams may have been the intent.
    let subjects: Vec<f64> = exams[0].subject_scores.values().copied().collect();
    let balance = if subjects.is_empty() {
        50.0
    } else {
        let value = balance_risk(&subjects);
        if value > 50.0 {
            notes.push("uneven performance across subjects".to_string());
        }
        value
    };

    let factors = RiskFactors {
        level,
        volatility,
        rank,
        balance,
    };
    let risk_score = weighted_total(&factors);

    let summary = if notes.is_empty() {
        "indicators normal".to_string()
    } else {
        notes.join(", ")
    };

    let recommended_actions = if risk_score > 70.0 {
        actions(&[
            "Flag for close attention and open a student file",
            "Build a personalised study plan",
            "Increase contact with the family",
            "Consider a wellbeing assessment",
        ])
    } else if risk_score > 50.0 {
        actions(&[
            "Monitor moderately",
            "Track progress at regular intervals",
            "Encourage balanced study across subjects",
        ])
    } else {
        actions(&["Keep up the current pace", "Explore stretch goals"])
    };

    WarningResult {
        student_id: series.student_id.clone(),
        risk_score,
        confidence: 0.8,
        explanation: format!("Composite risk score {risk_score:.0}. Main risk factors: {summary}"),
        recommended_actions,
        detail: WarningDetail::RiskScore {
            factors: Some(factors),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{ranked_series, series};

    fn factors_of(result: &WarningResult) -> RiskFactors {
        match result.detail {
            WarningDetail::RiskScore {
                factors: Some(factors),
            } => factors,
            _ => panic!("expected risk factors"),
        }
    }

    #[test]
    fn level_tiers_never_drop_as_average_falls() {
        let averages = [450.0, 400.0, 399.0, 300.0, 250.0, 200.0, 150.0, 0.0];
        for pair in averages.windows(2) {
            assert!(level_risk(pair[1]) >= level_risk(pair[0]));
        }
        assert_eq!(level_risk(199.9), 80.0);
        assert_eq!(level_risk(400.0), 20.0);
    }

    #[test]
    fn rank_tiers() {
        assert_eq!(rank_risk(10), 70.0);
        assert_eq!(rank_risk(3), 55.0);
        assert_eq!(rank_risk(0), 45.0);
        assert_eq!(rank_risk(-3), 35.0);
    }

    #[test]
    fn empty_series_is_low_confidence() {
        let empty = ScoreSeries {
            student_id: "s1".to_string(),
            name: String::new(),
            class_name: String::new(),
            exams: vec![],
        };
        let result = calculate_risk(&empty);
        assert_eq!(result.risk_score, 50.0);
        assert_eq!(result.confidence, 0.1);
    }

    #[test]
    fn worsening_rank_is_reported() {
        let result = calculate_risk(&ranked_series("s1", &[300.0, 280.0, 260.0], &[5, 10, 15]));
        let factors = factors_of(&result);
        assert_eq!(factors.level, 60.0);
        assert_eq!(factors.rank, 70.0);
        assert_eq!(factors.balance, 50.0);
        assert!((factors.volatility - 20.0 / 280.0 * 200.0).abs() < 1e-9);
        assert!(result.explanation.contains("class rank dropped 10 places"));
        assert_eq!(result.confidence, 0.8);
    }

    #[test]
    fn steady_high_scorer_reads_normal() {
        let result = calculate_risk(&ranked_series("s1", &[500.0, 500.0, 500.0], &[3, 3, 3]));
        assert!(result.explanation.ends_with("indicators normal"));
        // 20 * 0.3 + 0 + 45 * 0.25 + 50 * 0.25
        assert!((result.risk_score - 29.75).abs() < 1e-9);
    }

    #[test]
    fn balance_reads_first_exam_only() {
        let mut student = series("s1", &[500.0, 500.0]);
        student.exams[0]
            .subject_scores
            .extend([("math".to_string(), 100.0), ("english".to_string(), 100.0)]);
        student.exams[1]
            .subject_scores
            .extend([("math".to_string(), 10.0), ("english".to_string(), 190.0)]);
        let factors = factors_of(&calculate_risk(&student));
        assert_eq!(factors.balance, 0.0);
    }

    #[test]
    fn lopsided_subjects_are_reported() {
        let mut student = series("s1", &[500.0]);
        student.exams[0]
            .subject_scores
            .extend([("math".to_string(), 20.0), ("english".to_string(), 100.0)]);
        let result = calculate_risk(&student);
        assert_eq!(factors_of(&result).balance, 80.0);
        assert!(result.explanation.contains("uneven performance"));
    }
}
