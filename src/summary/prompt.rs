/// Prompt assembly for generated analyses.

use serde_json::{Map, Value, json};

use crate::model::{AnalysisRequest, NormalizedMeasurement, SampleKey, WqiResult};
use crate::parameters::spec_for;
use crate::quality::{QualityBand, SubIndices};

const EXPERT_INSTRUCTION: &str = "Act as an expert with a PhD in water parameter analysis, \
but you need to respond with language accessible to diverse audiences.";

fn or_unknown(field: &Option<String>) -> &str {
    field.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or("not informed")
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "not informed".to_string(),
        other => other.to_string(),
    }
}

/// Prompt for a user-submitted analysis request. `iqa` is the computed
/// index when the submitted values were complete enough to score.
pub fn build_custom_analysis_prompt(request: &AnalysisRequest, iqa: Option<f64>) -> String {
    let mut prompt = format!(
        "Analysis of water collected in a {}:\n\
         Collection date: {} at {}.\n\
         Location: {}.\n\n\
         Environmental conditions:\n\
         - Type of water body: {}\n\
         - Recent weather conditions: {}\n\
         - Nearby human activities: {}\n\
         - What will be the use of the water: {}\n\n\
         Physicochemical parameters:\n",
        or_unknown(&request.collection_site),
        or_unknown(&request.collection_date),
        or_unknown(&request.collection_time),
        or_unknown(&request.coordinates),
        or_unknown(&request.water_body_type),
        or_unknown(&request.weather_conditions),
        or_unknown(&request.human_activities),
        or_unknown(&request.usage),
    );

    for (key, value) in &request.parameters {
        prompt.push_str(&format!("- {}: {}\n", key, display_value(value)));
    }

    if let Some(score) = iqa {
        prompt.push_str(&format!(
            "\nComputed water quality index (IQA): {:.1} ({}).\n",
            score,
            QualityBand::classify(score).label()
        ));
    }

    prompt.push('\n');
    prompt.push_str(EXPERT_INSTRUCTION);
    prompt.push_str(" Generate an initial analysis of water quality based on this information.");
    prompt
}

/// Structured bundle describing one scored sample, handed to the generator.
pub fn build_sample_bundle(
    key: &SampleKey,
    normalized: &NormalizedMeasurement,
    result: &WqiResult,
) -> Value {
    let sub_indices = SubIndices::from_normalized(normalized).ok();

    let mut parameters = Map::new();
    for (parameter, reading) in normalized.iter() {
        let spec = spec_for(parameter);
        let mut entry = Map::new();
        entry.insert("label".to_string(), json!(spec.label));
        entry.insert("unit".to_string(), json!(spec.unit));
        entry.insert("value".to_string(), json!(reading.value()));
        if let Some(qi) = &sub_indices {
            entry.insert("qi".to_string(), json!(qi.get(parameter)));
        }
        parameters.insert(parameter.name().to_string(), Value::Object(entry));
    }

    let mut bundle = json!({
        "city": key.city,
        "river": key.river,
        "point": key.point,
        "date": key.date,
        "parameters": parameters,
    });
    match result {
        WqiResult::Score(score) => {
            bundle["iqa"] = json!(score);
            bundle["band"] = json!(QualityBand::classify(*score).label());
        }
        WqiResult::Failure(missing) => {
            bundle["missing"] = json!(missing);
        }
    }
    bundle
}

/// Prompt asking for a summary of `data`, framed by `context_label`.
pub fn build_summary_prompt(data: &Value, context_label: &str) -> String {
    let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
    format!(
        "Context: {}.\n\n\
         Monitoring data (JSON):\n{}\n\n\
         {} Summarize the water quality these results describe. If a parameter \
         is missing, say which and note that no index could be computed.",
        context_label, pretty, EXPERT_INSTRUCTION
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
