use crate::models::{actions, ScoreSeries, WarningDetail, WarningResult};
use crate::stats;

const MIN_EXAMS: usize = 3;

/// Maps the per-exam regression slope onto a risk tier.
pub fn risk_for_slope(slope: f64) -> f64 {
    if slope < -2.0 {
        85.0
    } else if slope < -1.0 {
        70.0
    } else if slope < 0.0 {
        55.0
    } else if slope > 1.0 {
        30.0
    } else {
        50.0
    }
}

pub fn predict_trend(series: &ScoreSeries) -> WarningResult {
    let scores = series.total_scores();

    if scores.len() < MIN_EXAMS {
        return WarningResult {
            student_id: series.student_id.clone(),
            risk_score: 50.0,
            confidence: 0.3,
            explanation: format!(
                "insufficient data: {} exams on record, at least {MIN_EXAMS} needed to forecast a trend",
                scores.len()
            ),
            recommended_actions: actions(&["Collect more exam results"]),
            detail: WarningDetail::TrendPrediction {
                exam_count: scores.len(),
                slope: None,
                predicted_next: None,
            },
        };
    }

    let fit = stats::linear_regression(&scores);
    let slope = fit.slope;
    let last = scores[scores.len() - 1];
    let predicted_next = last + slope;
    let direction = if slope > 0.0 { "rising" } else { "declining" };

    let recommended_actions = if slope < -1.0 {
        actions(&[
            "Schedule academic tutoring",
            "Review causes of the score decline",
            "Draw up a targeted study plan",
        ])
    } else {
        actions(&["Keep up the current pace", "Set a more ambitious target"])
    };

    WarningResult {
        student_id: series.student_id.clone(),
        risk_score: risk_for_slope(slope).clamp(0.0, 100.0),
        confidence: fit.r_squared.clamp(0.0, 0.9),
        explanation: format!(
            "Across {} exams scores are {direction} by {:.1} points per exam; next score predicted around {:.0}",
            scores.len(),
            slope.abs(),
            predicted_next
        ),
        recommended_actions,
        detail: WarningDetail::TrendPrediction {
            exam_count: scores.len(),
            slope: Some(slope),
            predicted_next: Some(predicted_next),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::series;

    fn predicted(result: &WarningResult) -> f64 {
        match result.detail {
            WarningDetail::TrendPrediction {
                predicted_next: Some(value),
                ..
            } => value,
            _ => panic!("expected a forecast"),
        }
    }

    #[test]
    fn slope_tiers() {
        assert_eq!(risk_for_slope(-3.0), 85.0);
        assert_eq!(risk_for_slope(-1.5), 70.0);
        assert_eq!(risk_for_slope(-0.5), 55.0);
        assert_eq!(risk_for_slope(0.5), 50.0);
        assert_eq!(risk_for_slope(1.0), 50.0);
        assert_eq!(risk_for_slope(2.0), 30.0);
    }

    #[test]
    fn short_history_is_neutral() {
        let result = predict_trend(&series("s1", &[80.0, 90.0]));
        assert_eq!(result.risk_score, 50.0);
        assert_eq!(result.confidence, 0.3);
        assert!(result.explanation.contains("insufficient data"));
    }

    #[test]
    fn rising_scores_are_low_risk() {
        let result = predict_trend(&series("s1", &[60.0, 65.0, 70.0, 75.0]));
        assert_eq!(result.risk_score, 30.0);
        assert_eq!(result.confidence, 0.9);
        assert!((predicted(&result) - 80.0).abs() < 1e-9);
        assert!(result.explanation.contains("rising"));
    }

    #[test]
    fn steep_decline_is_high_risk() {
        let result = predict_trend(&series("s1", &[300.0, 280.0, 260.0]));
        assert_eq!(result.risk_score, 85.0);
        assert!((predicted(&result) - 240.0).abs() < 1e-9);
        assert!(result.explanation.contains("declining by 20.0"));
        assert_eq!(result.recommended_actions.len(), 3);
    }

    #[test]
    fn forecast_uses_exam_dates_not_input_order() {
        let mut shuffled = series("s1", &[300.0, 280.0, 260.0]);
        shuffled.exams.reverse();
        let result = predict_trend(&shuffled);
        assert_eq!(result.risk_score, 85.0);
    }
}
