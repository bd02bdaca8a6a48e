use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use tracing::info;

use crate::models::{AlgorithmConfig, ExamRecord, ScoreSeries};

const STUDENT_ID: &str = "student_id";
const NAME: &str = "name";
const CLASS_NAME: &str = "class_name";
const EXAM_TITLE: &str = "exam_title";
const EXAM_DATE: &str = "exam_date";
const TOTAL_SCORE: &str = "total_score";
const RANK_IN_CLASS: &str = "rank_in_class";
const RANK_IN_SCHOOL: &str = "rank_in_school";

const FIXED_COLUMNS: [&str; 8] = [
    STUDENT_ID,
    NAME,
    CLASS_NAME,
    EXAM_TITLE,
    EXAM_DATE,
    TOTAL_SCORE,
    RANK_IN_CLASS,
    RANK_IN_SCHOOL,
];
const REQUIRED_COLUMNS: [&str; 3] = [STUDENT_ID, EXAM_DATE, TOTAL_SCORE];

/// Loads a grade export, JSON when the extension says so and CSV otherwise.
pub fn load_population(path: &Path) -> anyhow::Result<Vec<ScoreSeries>> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let population = if is_json {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str::<Vec<ScoreSeries>>(&raw)
            .with_context(|| format!("invalid score series JSON in {}", path.display()))?
    } else {
        let reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        read_csv(reader).with_context(|| format!("invalid grade export {}", path.display()))?
    };

    info!(
        students = population.len(),
        path = %path.display(),
        "loaded score history"
    );
    Ok(population)
}

pub fn load_configs(path: Option<&Path>) -> anyhow::Result<Vec<AlgorithmConfig>> {
    let Some(path) = path else {
        return Ok(AlgorithmConfig::defaults());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid algorithm config in {}", path.display()))
}

fn optional_rank(value: &str) -> anyhow::Result<Option<i32>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Ok(Some(trimmed.parse()?))
}

fn cell<'r>(record: &'r csv::StringRecord, columns: &HashMap<&str, usize>, name: &str) -> &'r str {
    columns
        .get(name)
        .and_then(|index| record.get(*index))
        .unwrap_or("")
        .trim()
}

/// One row per student and exam; unknown columns are subject scores.
pub fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> anyhow::Result<Vec<ScoreSeries>> {
    let headers = reader.headers()?.clone();
    let columns: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(index, name)| (name.trim(), index))
        .collect();

    for required in REQUIRED_COLUMNS {
        if !columns.contains_key(required) {
            bail!("missing required column `{required}`");
        }
    }

    let subject_columns: Vec<(String, usize)> = headers
        .iter()
        .enumerate()
        .filter(|(_, name)| !FIXED_COLUMNS.contains(&name.trim()))
        .map(|(index, name)| (name.trim().to_string(), index))
        .collect();

    let mut population: Vec<ScoreSeries> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (row_index, record) in reader.records().enumerate() {
        let record = record?;
        let line = row_index + 2;
        let field = |name: &str| cell(&record, &columns, name);

        let student_id = field(STUDENT_ID).to_string();
        if student_id.is_empty() {
            bail!("row {line}: empty student_id");
        }

        let exam_date = NaiveDate::parse_from_str(field(EXAM_DATE), "%Y-%m-%d")
            .with_context(|| format!("row {line}: bad exam_date `{}`", field(EXAM_DATE)))?;
        let total_score: f64 = field(TOTAL_SCORE)
            .parse()
            .with_context(|| format!("row {line}: bad total_score `{}`", field(TOTAL_SCORE)))?;
        let rank_in_class = optional_rank(field(RANK_IN_CLASS))
            .with_context(|| format!("row {line}: bad rank_in_class"))?;
        let rank_in_school = optional_rank(field(RANK_IN_SCHOOL))
            .with_context(|| format!("row {line}: bad rank_in_school"))?;

        let mut subject_scores = BTreeMap::new();
        for (subject, index) in &subject_columns {
            let raw = record.get(*index).unwrap_or("").trim();
            if raw.is_empty() {
                continue;
            }
            let score: f64 = raw
                .parse()
                .with_context(|| format!("row {line}: bad {subject} score `{raw}`"))?;
            subject_scores.insert(subject.clone(), score);
        }

        let exam = ExamRecord {
            exam_title: field(EXAM_TITLE).to_string(),
            exam_date,
            total_score,
            rank_in_class,
            rank_in_school,
            subject_scores,
        };

        let position = match positions.get(&student_id) {
            Some(position) => *position,
            None => {
                population.push(ScoreSeries {
                    student_id: student_id.clone(),
                    name: field(NAME).to_string(),
                    class_name: field(CLASS_NAME).to_string(),
                    exams: Vec::new(),
                });
                positions.insert(student_id, population.len() - 1);
                population.len() - 1
            }
        };
        population[position].exams.push(exam);
    }

    Ok(population)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(data: &str) -> csv::Reader<&[u8]> {
        csv::Reader::from_reader(data.as_bytes())
    }

    #[test]
    fn groups_rows_by_student_with_subjects() {
        let data = "\
student_id,name,class_name,exam_title,exam_date,total_score,rank_in_class,rank_in_school,math,english
s1,Avery Lee,7A,Midterm,2025-10-01,300,5,40,90,
s2,Jules Moreno,7A,Midterm,2025-10-01,410,1,3,95,98
s1,Avery Lee,7A,Final,2025-12-15,280,10,,85,70
";
        let population = read_csv(reader(data)).unwrap();
        assert_eq!(population.len(), 2);
        assert_eq!(population[0].student_id, "s1");
        assert_eq!(population[0].exams.len(), 2);
        assert_eq!(population[0].exams[0].subject_scores.len(), 1);
        assert_eq!(population[0].exams[1].subject_scores["english"], 70.0);
        assert_eq!(population[0].exams[1].rank_in_school, None);
        assert_eq!(population[1].class_name, "7A");
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let data = "student_id,exam_date\ns1,2025-10-01\n";
        let err = read_csv(reader(data)).unwrap_err();
        assert!(err.to_string().contains("total_score"));
    }

    #[test]
    fn bad_score_names_the_row() {
        let data = "student_id,exam_date,total_score\ns1,2025-10-01,abc\n";
        let err = read_csv(reader(data)).unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn loads_json_and_default_configs() {
        let path = std::env::temp_dir().join("cohort-risk-input-test.json");
        let json = r#"[{"student_id":"s1","exams":[{"exam_title":"Quiz","exam_date":"2025-09-01","total_score":72.5}]}]"#;
        std::fs::write(&path, json).unwrap();
        let population = load_population(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(population[0].exams[0].total_score, 72.5);
        assert_eq!(load_configs(None).unwrap().len(), 4);
    }
}
