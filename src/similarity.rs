use crate::models::{actions, ScoreSeries, WarningDetail, WarningResult};
use crate::stats;

pub const SIMILARITY_THRESHOLD: f64 = 0.7;
const MAX_MATCHES: usize = 3;
const RECENT_WINDOW: usize = 3;

pub type FeatureVector = [f64; 4];

/// `[average / 100, spread / 50, rank drift / 10 (clamped to ±1), recent shift / 50]`
///
/// Spread is the population deviation (variance over n). The recent shift is
/// the last three scores' average minus the earlier average; it is 0 unless
/// there is at least one earlier score, so exactly three exams give 0.
pub fn feature_vector(series: &ScoreSeries) -> FeatureVector {
    let scores = series.total_scores();
    if scores.is_empty() {
        return [0.0; 4];
    }

    let average = stats::mean(&scores);
    let spread = stats::population_standard_deviation(&scores);

    let ranks = series.class_ranks();
    let rank_trend = if ranks.len() >= 2 {
        (ranks[ranks.len() - 1] - ranks[0]) as f64
    } else {
        0.0
    };

    let split = scores.len().saturating_sub(RECENT_WINDOW);
    let recent_delta = if scores.len() >= RECENT_WINDOW && split > 0 {
        stats::mean(&scores[split..]) - stats::mean(&scores[..split])
    } else {
        0.0
    };

    [
        average / 100.0,
        spread / 50.0,
        (rank_trend / 10.0).clamp(-1.0, 1.0),
        recent_delta / 50.0,
    ]
}

pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let magnitude_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let magnitude_b = b.iter().map(|y| y * y).sum::<f64>().sqrt();
    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }
    dot / (magnitude_a * magnitude_b)
}

/// Peers above the threshold, most similar first. Ties keep population order.
pub fn rank_peers(target: &ScoreSeries, population: &[ScoreSeries]) -> Vec<(String, f64)> {
    let target_vector = feature_vector(target);
    let mut matches: Vec<(String, f64)> = population
        .iter()
        .filter(|student| student.student_id != target.student_id)
        .map(|student| {
            let similarity = cosine_similarity(&target_vector, &feature_vector(student));
            (student.student_id.clone(), similarity)
        })
        .filter(|(_, similarity)| *similarity > SIMILARITY_THRESHOLD)
        .collect();

    matches.sort_by(|a, b| b.1.total_cmp(&a.1));
    matches
}

pub fn find_similar_students(target: &ScoreSeries, population: &[ScoreSeries]) -> WarningResult {
    let similar_cases: Vec<String> = rank_peers(target, population)
        .into_iter()
        .take(MAX_MATCHES)
        .map(|(student_id, _)| student_id)
        .collect();

    WarningResult {
        student_id: target.student_id.clone(),
        risk_score: 45.0,
        confidence: 0.7,
        explanation: format!(
            "Found {} students with a similar performance profile for comparison",
            similar_cases.len()
        ),
        recommended_actions: actions(&[
            "Study what worked for similar students",
            "Set up peer study groups",
            "Use similar cases to plan interventions",
        ]),
        detail: WarningDetail::SimilarStudents { similar_cases },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{ranked_series, series};

    #[test]
    fn self_similarity_is_one() {
        let v = [0.8, 0.2, -0.5, 0.1];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = [3.0, 0.4, 1.0, -0.2];
        let b = [2.5, 0.9, -1.0, 0.3];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn zero_or_mismatched_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn feature_vector_components() {
        let student = ranked_series("s1", &[100.0, 100.0, 200.0, 200.0, 200.0], &[20, 5]);
        let v = feature_vector(&student);
        assert!((v[0] - 1.6).abs() < 1e-9);
        let spread = stats::population_standard_deviation(&[100.0, 100.0, 200.0, 200.0, 200.0]);
        assert!((v[1] - spread / 50.0).abs() < 1e-9);
        assert_eq!(v[2], -1.0);
        // recent three average 200, earlier two average 100
        assert!((v[3] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn spread_uses_population_deviation() {
        let v = feature_vector(&series("s1", &[100.0, 200.0]));
        assert_eq!(v[1], 1.0);
    }

    #[test]
    fn short_history_has_no_recent_shift() {
        assert_eq!(feature_vector(&series("s1", &[80.0, 90.0, 100.0]))[3], 0.0);
        assert_eq!(feature_vector(&series("s1", &[]))[0], 0.0);
    }

    #[test]
    fn returns_top_three_excluding_self() {
        let target = series("t", &[300.0, 310.0, 320.0, 330.0]);
        let population = vec![
            target.clone(),
            series("a", &[300.0, 310.0, 320.0, 330.0]),
            series("b", &[290.0, 305.0, 320.0, 335.0]),
            series("c", &[300.0, 312.0, 318.0, 331.0]),
            series("d", &[301.0, 309.0, 321.0, 329.0]),
            series("e", &[0.0, 0.0, 0.0, 0.0]),
        ];
        let result = find_similar_students(&target, &population);
        let cases = result.similar_cases().unwrap();
        assert_eq!(cases.len(), 3);
        assert_eq!(cases[0], "a");
        assert!(!cases.iter().any(|id| id == "t" || id == "e"));
        assert_eq!(result.risk_score, 45.0);
        assert_eq!(result.confidence, 0.7);
    }

    #[test]
    fn equal_similarity_keeps_population_order() {
        let target = series("t", &[300.0, 300.0, 300.0]);
        let population = vec![
            series("x", &[300.0, 300.0, 300.0]),
            series("y", &[300.0, 300.0, 300.0]),
        ];
        let peers = rank_peers(&target, &population);
        let ids: Vec<&str> = peers.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y"]);
    }
}
