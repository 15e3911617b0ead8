/// Weighted water quality index.
///
/// Scoring is all-or-nothing: a single missing parameter produces
/// `WqiResult::Failure` listing every missing parameter, never a partial
/// score.

use crate::model::{NormalizedMeasurement, Parameter, RawMeasurement, Reading, WqiResult};
use crate::parameters::{total_weight, weight};
use crate::quality::normalize::normalize;
use crate::quality::thresholds::sub_index;

/// Per-parameter sub-indices (qi), each in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubIndices {
    values: [f64; Parameter::COUNT],
}

impl SubIndices {
    /// Converts every present value. Returns the missing parameters, in
    /// declaration order, if any value is missing.
    pub fn from_normalized(normalized: &NormalizedMeasurement) -> Result<Self, Vec<Parameter>> {
        let mut values = [0.0; Parameter::COUNT];
        let mut missing = Vec::new();
        for (parameter, reading) in normalized.iter() {
            match reading {
                Reading::Present(v) => values[parameter.index()] = sub_index(parameter, v),
                Reading::Missing => missing.push(parameter),
            }
        }
        if missing.is_empty() {
            Ok(Self { values })
        } else {
            Err(missing)
        }
    }

    pub fn get(&self, parameter: Parameter) -> f64 {
        self.values[parameter.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Parameter, f64)> + '_ {
        Parameter::ALL.iter().map(|p| (*p, self.get(*p)))
    }

    /// `Σ(qi·w) / Σw` over all parameters.
    pub fn weighted_average(&self) -> f64 {
        let weighted: f64 = self.iter().map(|(p, qi)| qi * weight(p)).sum();
        weighted / total_weight()
    }
}

/// Scores a normalized measurement.
pub fn score(normalized: &NormalizedMeasurement) -> WqiResult {
    match SubIndices::from_normalized(normalized) {
        Ok(qi) => WqiResult::Score(qi.weighted_average()),
        Err(missing) => WqiResult::Failure(missing),
    }
}

/// Normalizes then scores.
pub fn compute_wqi(raw: &RawMeasurement) -> WqiResult {
    score(&normalize(raw))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
