/// Parameter registry for the water quality index.
///
/// Defines the canonical metadata for each of the nine parameters: display
/// name, storage column, unit, weight and sub-index rule. This is the single
/// source of truth for the weight table and the threshold table; all other
/// modules should reference parameters from here rather than hardcoding
/// column names or weights.

use std::str::FromStr;

use crate::model::Parameter;
use crate::quality::thresholds::SubIndexRule;

// ---------------------------------------------------------------------------
// Parameter metadata
// ---------------------------------------------------------------------------

/// Metadata for a single index parameter.
#[derive(Debug)]
pub struct ParameterSpec {
    pub parameter: Parameter,
    /// Human-readable name used in reports.
    pub label: &'static str,
    /// Column in `monitoring_data` holding the raw value.
    pub column: &'static str,
    pub unit: &'static str,
    /// Weight in the aggregate index. Positive; the table sums to 1.00.
    pub weight: f64,
    pub rule: SubIndexRule,
}

/// All index parameters, in `Parameter` declaration order.
///
/// Weights follow the nine-parameter NSF/CETESB index. Thresholds are the
/// two-level cutoffs the service has always applied.
pub static PARAMETER_REGISTRY: [ParameterSpec; Parameter::COUNT] = [
    ParameterSpec {
        parameter: Parameter::Od,
        label: "Dissolved oxygen",
        column: "od",
        unit: "mg/L",
        weight: 0.17,
        rule: SubIndexRule::AtLeast { limit: 6.0, met: 80.0, otherwise: 50.0 },
    },
    ParameterSpec {
        parameter: Parameter::Coliformes,
        label: "Fecal coliforms",
        column: "coliforms",
        unit: "NMP/100mL",
        weight: 0.15,
        // high counts are the bad case
        rule: SubIndexRule::AtLeast { limit: 1000.0, met: 30.0, otherwise: 70.0 },
    },
    ParameterSpec {
        parameter: Parameter::Dbo,
        label: "Biochemical oxygen demand",
        column: "dbo",
        unit: "mg/L",
        weight: 0.10,
        rule: SubIndexRule::AtMost { limit: 5.0, met: 60.0, otherwise: 30.0 },
    },
    ParameterSpec {
        parameter: Parameter::NitrogenioTotal,
        label: "Total nitrogen",
        column: "total_nitrogen",
        unit: "mg/L",
        weight: 0.10,
        rule: SubIndexRule::AtMost { limit: 10.0, met: 70.0, otherwise: 40.0 },
    },
    ParameterSpec {
        parameter: Parameter::FosforoTotal,
        label: "Total phosphorus",
        column: "total_phosphorus",
        unit: "mg/L",
        weight: 0.10,
        rule: SubIndexRule::AtMost { limit: 0.1, met: 90.0, otherwise: 50.0 },
    },
    ParameterSpec {
        parameter: Parameter::Turbidez,
        label: "Turbidity",
        column: "turbidity",
        unit: "NTU",
        weight: 0.08,
        rule: SubIndexRule::AtMost { limit: 10.0, met: 85.0, otherwise: 40.0 },
    },
    ParameterSpec {
        parameter: Parameter::Tds,
        label: "Total dissolved solids",
        column: "tds",
        unit: "mg/L",
        weight: 0.08,
        rule: SubIndexRule::AtMost { limit: 500.0, met: 75.0, otherwise: 50.0 },
    },
    ParameterSpec {
        parameter: Parameter::Ph,
        label: "pH",
        column: "ph",
        unit: "",
        weight: 0.12,
        rule: SubIndexRule::Within { low: 6.5, high: 8.5, met: 90.0, otherwise: 60.0 },
    },
    ParameterSpec {
        parameter: Parameter::Temperatura,
        label: "Temperature",
        column: "temperature",
        unit: "°C",
        weight: 0.10,
        rule: SubIndexRule::AtMost { limit: 25.0, met: 70.0, otherwise: 50.0 },
    },
];

/// Registry entry for a parameter.
pub fn spec_for(parameter: Parameter) -> &'static ParameterSpec {
    &PARAMETER_REGISTRY[parameter.index()]
}

pub fn weight(parameter: Parameter) -> f64 {
    spec_for(parameter).weight
}

/// Sum of all weights; the index divides by this rather than assuming 1.
pub fn total_weight() -> f64 {
    PARAMETER_REGISTRY.iter().map(|s| s.weight).sum()
}

/// Storage columns in declaration order, suitable for building SELECT lists.
pub fn all_columns() -> Vec<&'static str> {
    PARAMETER_REGISTRY.iter().map(|s| s.column).collect()
}

/// Looks up a parameter by canonical name ("OD", "pH") or storage column
/// ("od", "turbidity"), ignoring case. Returns `None` if not found.
pub fn find_parameter(name: &str) -> Option<Parameter> {
    let name = name.trim();
    PARAMETER_REGISTRY
        .iter()
        .find(|s| s.parameter.name().eq_ignore_ascii_case(name) || s.column.eq_ignore_ascii_case(name))
        .map(|s| s.parameter)
}

impl FromStr for Parameter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        find_parameter(s).ok_or_else(|| format!("unknown parameter '{}'", s))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
