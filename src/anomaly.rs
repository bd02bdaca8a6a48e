use crate::models::{actions, ScoreSeries, WarningDetail, WarningResult};
use crate::stats;

const RECENT_WINDOW: usize = 3;

pub fn risk_for_z(z: f64) -> f64 {
    let magnitude = z.abs();
    if magnitude > 2.5 {
        90.0
    } else if magnitude > 1.5 {
        70.0
    } else if magnitude > 1.0 {
        55.0
    } else {
        40.0
    }
}

/// Compares the latest score with the student's own history.
///
/// `_class_scores` is accepted but never enters the calculation. Whether the
/// class baseline was meant to replace the personal one is an open question.
pub fn detect_anomalies(series: &ScoreSeries, _class_scores: &[f64]) -> WarningResult {
    let scores = series.total_scores();
    let recent = &scores[scores.len().saturating_sub(RECENT_WINDOW)..];

    if recent.len() < 2 {
        return WarningResult {
            student_id: series.student_id.clone(),
            risk_score: 40.0,
            confidence: 0.2,
            explanation: "insufficient data for anomaly detection".to_string(),
            recommended_actions: actions(&["Keep observing"]),
            detail: WarningDetail::AnomalyDetection {
                latest_score: recent.last().copied(),
                personal_mean: None,
                z_score: None,
            },
        };
    }

    let latest = recent[recent.len() - 1];
    let personal_mean = stats::mean(&scores);
    let z = stats::z_score(latest, &scores).abs();

    let explanation = if z > 2.5 {
        format!(
            "Latest score {latest:.0} deviates severely from the personal average {personal_mean:.1} (z-score {z:.2})"
        )
    } else if z > 1.5 {
        format!(
            "Latest score {latest:.0} deviates markedly from the personal average {personal_mean:.1} (z-score {z:.2})"
        )
    } else if z > 1.0 {
        format!("Latest score {latest:.0} deviates slightly from the personal average {personal_mean:.1}")
    } else {
        format!("Latest score {latest:.0} is within the normal range, personal average {personal_mean:.1}")
    };

    let recommended_actions = if z > 1.5 {
        actions(&[
            "Look into the student's recent study situation",
            "Check for outside disruptions",
            "Consider one-on-one tutoring",
        ])
    } else {
        actions(&["Continue routine monitoring"])
    };

    WarningResult {
        student_id: series.student_id.clone(),
        risk_score: risk_for_z(z),
        confidence: (z / 3.0).min(0.9),
        explanation,
        recommended_actions,
        detail: WarningDetail::AnomalyDetection {
            latest_score: Some(latest),
            personal_mean: Some(personal_mean),
            z_score: Some(z),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::series;

    #[test]
    fn single_exam_is_neutral() {
        let result = detect_anomalies(&series("s1", &[70.0]), &[]);
        assert_eq!(result.risk_score, 40.0);
        assert_eq!(result.confidence, 0.2);
    }

    #[test]
    fn steady_history_is_normal() {
        let result = detect_anomalies(&series("s1", &[70.0, 70.0, 70.0]), &[]);
        assert_eq!(result.risk_score, 40.0);
        assert_eq!(result.confidence, 0.0);
        assert!(result.explanation.contains("normal range"));
    }

    #[test]
    fn marked_jump_is_flagged() {
        let result = detect_anomalies(&series("s1", &[50.0, 50.0, 50.0, 50.0, 100.0]), &[]);
        assert_eq!(result.risk_score, 70.0);
        assert!((result.confidence - 40.0 / 500.0_f64.sqrt() / 3.0).abs() < 1e-9);
        assert_eq!(result.recommended_actions.len(), 3);
    }

    #[test]
    fn severe_jump_caps_confidence() {
        let mut scores = vec![50.0; 9];
        scores.push(100.0);
        let result = detect_anomalies(&series("s1", &scores), &[]);
        assert_eq!(result.risk_score, 90.0);
        assert_eq!(result.confidence, 0.9);
    }

    #[test]
    fn class_scores_do_not_change_result() {
        let student = series("s1", &[50.0, 50.0, 50.0, 50.0, 100.0]);
        let alone = detect_anomalies(&student, &[]);
        let with_class = detect_anomalies(&student, &[10.0, 500.0, 90.0]);
        assert_eq!(alone, with_class);
    }
}
