//! Early-warning analytics over student exam histories.
//!
//! Every analyzer is a pure function of its inputs, so callers can spread
//! students across threads freely; the population slice is only read.

pub mod anomaly;
pub mod engine;
pub mod input;
pub mod models;
pub mod report;
pub mod risk;
pub mod similarity;
pub mod stats;
pub mod trend;

pub use engine::{run, run_cohort, StudentWarnings};
pub use models::{
    AlgorithmConfig, AlgorithmType, ExamRecord, ScoreSeries, WarningDetail, WarningResult,
};
