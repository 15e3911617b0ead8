/// Sub-index threshold rules and quality bands.
///
/// Each parameter maps its measured value to a sub-index (qi) through a
/// two-level step: one score when the condition holds, another when it
/// does not. Boundaries are inclusive. The per-parameter rules themselves
/// live in `parameters::PARAMETER_REGISTRY`.

use serde::Serialize;

use crate::model::Parameter;
use crate::parameters::spec_for;

/// Two-level step rule converting a measured value into a sub-index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubIndexRule {
    /// `value >= limit` scores `met`, anything else scores `otherwise`.
    AtLeast { limit: f64, met: f64, otherwise: f64 },
    /// `value <= limit` scores `met`, anything else scores `otherwise`.
    AtMost { limit: f64, met: f64, otherwise: f64 },
    /// `low <= value <= high` scores `met`, anything else scores `otherwise`.
    Within { low: f64, high: f64, met: f64, otherwise: f64 },
}

impl SubIndexRule {
    /// Whether the rule's condition holds for `value`. NaN never does.
    pub fn is_met(&self, value: f64) -> bool {
        match *self {
            SubIndexRule::AtLeast { limit, .. } => value >= limit,
            SubIndexRule::AtMost { limit, .. } => value <= limit,
            SubIndexRule::Within { low, high, .. } => low <= value && value <= high,
        }
    }

    pub fn score(&self, value: f64) -> f64 {
        let (met, otherwise) = self.levels();
        if self.is_met(value) { met } else { otherwise }
    }

    /// The two output levels, `(met, otherwise)`.
    pub fn levels(&self) -> (f64, f64) {
        match *self {
            SubIndexRule::AtLeast { met, otherwise, .. }
            | SubIndexRule::AtMost { met, otherwise, .. }
            | SubIndexRule::Within { met, otherwise, .. } => (met, otherwise),
        }
    }
}

/// Sub-index for a single measured value.
pub fn sub_index(parameter: Parameter, value: f64) -> f64 {
    spec_for(parameter).rule.score(value)
}

// ---------------------------------------------------------------------------
// Quality bands
// ---------------------------------------------------------------------------

/// Descriptive band for an aggregate index, in ascending order of quality.
///
/// Bands are only used for labelling reports and summaries:
///   very poor <= 19 < poor <= 36 < fair <= 51 < good <= 79 < excellent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityBand {
    VeryPoor,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl QualityBand {
    pub fn classify(score: f64) -> Self {
        if score > 79.0 {
            QualityBand::Excellent
        } else if score > 51.0 {
            QualityBand::Good
        } else if score > 36.0 {
            QualityBand::Fair
        } else if score > 19.0 {
            QualityBand::Poor
        } else {
            QualityBand::VeryPoor
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityBand::Excellent => "Excellent",
            QualityBand::Good => "Good",
            QualityBand::Fair => "Fair",
            QualityBand::Poor => "Poor",
            QualityBand::VeryPoor => "Very poor",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Parameter::Od, 6.0, 80.0)]
    #[case(Parameter::Od, 5.99, 50.0)]
    #[case(Parameter::Coliformes, 1000.0, 30.0)]
    #[case(Parameter::Coliformes, 999.0, 70.0)]
    #[case(Parameter::Dbo, 5.0, 60.0)]
    #[case(Parameter::Dbo, 5.01, 30.0)]
    #[case(Parameter::NitrogenioTotal, 10.0, 70.0)]
    #[case(Parameter::NitrogenioTotal, 10.5, 40.0)]
    #[case(Parameter::FosforoTotal, 0.1, 90.0)]
    #[case(Parameter::FosforoTotal, 0.11, 50.0)]
    #[case(Parameter::Turbidez, 10.0, 85.0)]
    #[case(Parameter::Turbidez, 40.0, 40.0)]
    #[case(Parameter::Tds, 500.0, 75.0)]
    #[case(Parameter::Tds, 501.0, 50.0)]
    #[case(Parameter::Ph, 6.5, 90.0)]
    #[case(Parameter::Ph, 8.5, 90.0)]
    #[case(Parameter::Ph, 6.49, 60.0)]
    #[case(Parameter::Ph, 8.51, 60.0)]
    #[case(Parameter::Temperatura, 25.0, 70.0)]
    #[case(Parameter::Temperatura, 25.1, 50.0)]
    fn test_sub_index_boundaries_are_inclusive(
        #[case] parameter: Parameter,
        #[case] value: f64,
        #[case] expected: f64,
    ) {
        assert_eq!(
            sub_index(parameter, value),
            expected,
            "{} = {} should score {}",
            parameter,
            value,
            expected
        );
    }

    #[test]
    fn test_nan_falls_to_the_otherwise_level() {
        for p in Parameter::ALL {
            let (_, otherwise) = spec_for(p).rule.levels();
            assert_eq!(sub_index(p, f64::NAN), otherwise, "NaN {} should not meet its rule", p);
        }
    }

    #[test]
    fn test_every_level_is_within_0_and_100() {
        for p in Parameter::ALL {
            let (met, otherwise) = spec_for(p).rule.levels();
            assert!((0.0..=100.0).contains(&met), "{} met level out of range", p);
            assert!((0.0..=100.0).contains(&otherwise), "{} otherwise level out of range", p);
        }
    }

    #[test]
    fn test_quality_band_edges() {
        assert_eq!(QualityBand::classify(100.0), QualityBand::Excellent);
        assert_eq!(QualityBand::classify(79.0), QualityBand::Good);
        assert_eq!(QualityBand::classify(76.7), QualityBand::Good);
        assert_eq!(QualityBand::classify(51.0), QualityBand::Fair);
        assert_eq!(QualityBand::classify(36.0), QualityBand::Poor);
        assert_eq!(QualityBand::classify(19.0), QualityBand::VeryPoor);
        assert_eq!(QualityBand::classify(0.0), QualityBand::VeryPoor);
    }

    #[test]
    fn test_quality_bands_are_ordered_ascending() {
        assert!(QualityBand::VeryPoor < QualityBand::Poor);
        assert!(QualityBand::Poor < QualityBand::Fair);
        assert!(QualityBand::Fair < QualityBand::Good);
        assert!(QualityBand::Good < QualityBand::Excellent);
    }
}
