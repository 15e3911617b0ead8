/// Water quality index service.
///
/// Computes the nine-parameter water quality index (IQA) from monitoring
/// samples, serves filtered sample series, and produces generated analyses
/// and PDF reports.
///
/// - `model`: shared types and collaborator errors.
/// - `parameters`: parameter registry (columns, units, weights, rules).
/// - `quality`: the pure index pipeline (normalize, sub-index, score).
/// - `db`: PostgreSQL record store.
/// - `summary`: prompt assembly and the completions client.
/// - `report`: PDF rendering.
/// - `service`: request handlers and response bodies.
/// - `config`, `logging`: ambient setup.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod parameters;
pub mod quality;
pub mod report;
pub mod service;
pub mod summary;
