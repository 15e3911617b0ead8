/// Water quality index computation.
///
/// This is the pure core of the service: no I/O, no shared state, safe to
/// call from anywhere. Callers hand in a raw measurement and get back either
/// a score or the list of parameters that kept it from being scored.
///
/// Submodules:
/// - `normalize`: raw values (numbers, locale strings, nulls) to readings.
/// - `thresholds`: per-parameter sub-index rules and quality bands.
/// - `wqi`: completeness check and weighted aggregation.

pub mod normalize;
pub mod thresholds;
pub mod wqi;

pub use normalize::normalize;
pub use thresholds::QualityBand;
pub use wqi::{SubIndices, compute_wqi, score};
