/// Measurement normalization.
///
/// Turns raw per-parameter values into clean floats. Unusable input never
/// errors: it becomes `Reading::Missing`, and the scorer decides what that
/// means.

use serde_json::{Map, Value};

use crate::model::{NormalizedMeasurement, Parameter, RawMeasurement, RawValue, Reading};
use crate::parameters::find_parameter;

/// Normalizes every parameter. The result always has all nine entries.
pub fn normalize(raw: &RawMeasurement) -> NormalizedMeasurement {
    let mut normalized = NormalizedMeasurement::default();
    for parameter in Parameter::ALL {
        normalized.set(parameter, normalize_value(raw.get(parameter)));
    }
    normalized
}

/// Normalizes a single value; `None` means the key was absent.
pub fn normalize_value(value: Option<&RawValue>) -> Reading {
    match value {
        None | Some(RawValue::Null) => Reading::Missing,
        Some(RawValue::Number(v)) => Reading::Present(*v),
        Some(RawValue::Text(text)) => clean_numeric_text(text)
            .parse::<f64>()
            .map(Reading::Present)
            .unwrap_or(Reading::Missing),
    }
}

/// Keeps only digits, periods and commas, then turns commas into periods.
///
/// "7,5" -> "7.5", "pH: 7.2 units" -> "7.2", "1.234,5" -> "1.234.5" (which
/// then fails to parse).
pub fn clean_numeric_text(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .map(|c| if c == ',' { '.' } else { c })
        .collect()
}

impl From<&Value> for RawValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => RawValue::Null,
            Value::Number(n) => n.as_f64().map(RawValue::Number).unwrap_or(RawValue::Null),
            Value::String(s) => RawValue::Text(s.clone()),
            other => RawValue::Text(other.to_string()),
        }
    }
}

/// Builds a raw measurement from a JSON object keyed by parameter name or
/// column. Keys that name no parameter are ignored.
pub fn raw_from_json(map: &Map<String, Value>) -> RawMeasurement {
    let mut raw = RawMeasurement::new();
    for (key, value) in map {
        if let Some(parameter) = find_parameter(key) {
            raw.insert(parameter, RawValue::from(value));
        }
    }
    raw
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    #[test]
    fn test_empty_input_yields_all_nine_missing() {
        let normalized = normalize(&RawMeasurement::new());
        assert_eq!(normalized.iter().count(), Parameter::COUNT);
        assert_eq!(normalized.missing(), Parameter::ALL.to_vec());
    }

    #[test]
    fn test_decimal_comma_becomes_decimal_point() {
        assert_eq!(normalize_value(Some(&text("7,5"))), Reading::Present(7.5));
        assert_eq!(normalize_value(Some(&text("0,05"))), Reading::Present(0.05));
    }

    #[test]
    fn test_noise_around_a_single_number_is_stripped() {
        assert_eq!(normalize_value(Some(&text("pH: 7.2 units"))), Reading::Present(7.2));
        assert_eq!(normalize_value(Some(&text("22 °C"))), Reading::Present(22.0));
        assert_eq!(normalize_value(Some(&text(" 8 mg/L"))), Reading::Present(8.0));
    }

    #[test]
    fn test_strings_without_digits_are_missing() {
        assert_eq!(normalize_value(Some(&text(""))), Reading::Missing);
        assert_eq!(normalize_value(Some(&text("n/a"))), Reading::Missing);
        assert_eq!(normalize_value(Some(&text("."))), Reading::Missing);
    }

    #[test]
    fn test_multiple_separators_are_missing() {
        // thousands separator plus decimal comma collapses to two periods
        assert_eq!(normalize_value(Some(&text("1.234,5"))), Reading::Missing);
        assert_eq!(normalize_value(Some(&text("6.5 - 7.0"))), Reading::Missing);
    }

    #[test]
    fn test_thousands_comma_is_read_as_decimal() {
        // A lone separator is always taken as the decimal mark.
        assert_eq!(normalize_value(Some(&text("1,200"))), Reading::Present(1.2));
    }

    #[test]
    fn test_numbers_and_nulls() {
        assert_eq!(normalize_value(Some(&RawValue::Number(300.0))), Reading::Present(300.0));
        assert_eq!(normalize_value(Some(&RawValue::Null)), Reading::Missing);
        assert_eq!(normalize_value(None), Reading::Missing);
    }

    #[test]
    fn test_minus_sign_is_stripped() {
        assert_eq!(normalize_value(Some(&text("-3"))), Reading::Present(3.0));
    }

    #[test]
    fn test_normalize_keeps_present_values_and_marks_the_rest() {
        let raw = RawMeasurement::new()
            .with(Parameter::Od, RawValue::Number(8.0))
            .with(Parameter::Ph, text("7,0"))
            .with(Parameter::Tds, text("sem leitura"));
        let normalized = normalize(&raw);
        assert_eq!(normalized.get(Parameter::Od), Reading::Present(8.0));
        assert_eq!(normalized.get(Parameter::Ph), Reading::Present(7.0));
        assert_eq!(normalized.get(Parameter::Tds), Reading::Missing);
        assert_eq!(normalized.missing().len(), 7);
    }

    #[test]
    fn test_raw_from_json_maps_names_and_columns() {
        let body = json!({
            "OD": 8,
            "turbidity": "5,0",
            "pH": null,
            "salinity": 3.1,
            "TDS": true
        });
        let raw = raw_from_json(body.as_object().unwrap());
        assert_eq!(raw.get(Parameter::Od), Some(&RawValue::Number(8.0)));
        assert_eq!(raw.get(Parameter::Turbidez), Some(&text("5,0")));
        assert_eq!(raw.get(Parameter::Ph), Some(&RawValue::Null));
        assert_eq!(raw.get(Parameter::Tds), Some(&text("true")));
        assert_eq!(raw.iter().count(), 4, "unknown keys should be dropped");
    }

    #[test]
    fn test_raw_from_json_without_known_keys_is_empty() {
        let body = json!({"salinity": 3.1, "colour": "brown"});
        assert!(raw_from_json(body.as_object().unwrap()).is_empty());

        let body = json!({"salinity": 3.1, "od": "7,9"});
        assert!(!raw_from_json(body.as_object().unwrap()).is_empty());
    }
}
