use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cohort_risk_analytics::input::{load_configs, load_population};
use cohort_risk_analytics::models::ScoreSeries;
use cohort_risk_analytics::{engine, report, stats};

#[derive(Parser)]
#[command(name = "cohort-risk")]
#[command(about = "Early warning analytics over student exam histories", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the warning algorithms for one student
    Analyze {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        student: String,
        /// JSON list of algorithm configs; all algorithms enabled when omitted
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Print score statistics for one student
    Stats {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        student: String,
    },
    /// Generate a markdown report for the whole cohort
    Report {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn find_student<'a>(
    population: &'a [ScoreSeries],
    student_id: &str,
    path: &Path,
) -> anyhow::Result<&'a ScoreSeries> {
    population
        .iter()
        .find(|series| series.student_id == student_id)
        .with_context(|| format!("student {student_id} not found in {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cohort_risk_analytics=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            student,
            config,
            json,
        } => {
            let population = load_population(&input)?;
            let configs = load_configs(config.as_deref())?;
            let series = find_student(&population, &student, &input)?;
            let results = engine::run(series, &population, &configs);

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
                return Ok(());
            }

            if results.is_empty() {
                println!("No warnings passed the configured thresholds.");
                return Ok(());
            }

            println!("Warnings for {} ({}):", series.name, series.student_id);
            for result in &results {
                println!(
                    "- [{}] risk {:.1}, confidence {:.2}: {}",
                    result.algorithm_type().as_str(),
                    result.risk_score,
                    result.confidence,
                    result.explanation
                );
                for action in &result.recommended_actions {
                    println!("    * {action}");
                }
                if let Some(cases) = result.similar_cases() {
                    if !cases.is_empty() {
                        println!("    similar students: {}", cases.join(", "));
                    }
                }
            }
        }
        Commands::Stats { input, student } => {
            let population = load_population(&input)?;
            let series = find_student(&population, &student, &input)?;
            let scores = series.total_scores();

            let summary = stats::five_number_summary(&scores);
            let shape = stats::analyze_distribution(&scores);
            let trend = stats::detect_trend(&scores);
            let outliers = stats::detect_outliers_iqr(&scores);

            println!("Score statistics for {} across {} exams:", series.student_id, scores.len());
            println!(
                "- min {:.1}, Q1 {:.1}, median {:.1}, Q3 {:.1}, max {:.1}",
                summary.min, summary.q1, summary.median, summary.q3, summary.max
            );
            println!(
                "- mean {:.1}, std dev {:.1}, skewness {:.2}, mode {}",
                shape.mean,
                shape.std_dev,
                shape.skewness,
                shape
                    .mode
                    .map_or_else(|| "none".to_string(), |mode| format!("{mode:.1}"))
            );
            println!(
                "- trend {:?} at {:.2} per exam (confidence {:.2})",
                trend.direction, trend.slope, trend.confidence
            );
            if outliers.outliers.is_empty() {
                println!("- no outliers");
            } else {
                println!("- outliers: {:?}", outliers.outliers);
            }
        }
        Commands::Report { input, config, out } => {
            let population = load_population(&input)?;
            let configs = load_configs(config.as_deref())?;
            let report = report::build_report(&population, &configs);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
