/// Request handlers for the service's external contract.
///
/// Each handler takes its collaborators as trait objects, runs the index
/// pipeline where needed, and returns the response body that the transport
/// serializes. Handlers never panic on bad data: incomplete samples come
/// back as `{"error": ...}` bodies, collaborator failures as
/// `ServiceError` with an HTTP-style status.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::db::RecordStore;
use crate::logging::{self, DataSource};
use crate::model::{
    AnalysisRequest, GenerationError, IqaFilter, MonitoringFilter, NewsItem, NormalizedMeasurement,
    RenderError, SampleKey, StoreError, WqiResult,
};
use crate::parameters::spec_for;
use crate::quality::normalize::raw_from_json;
use crate::quality::{QualityBand, SubIndices, compute_wqi, normalize, score};
use crate::report::ReportRenderer;
use crate::summary::TextGenerator;
use crate::summary::prompt::{build_custom_analysis_prompt, build_sample_bundle};

pub const EMPTY_ANALYSIS_MESSAGE: &str =
    "At least one parameter must be provided to generate the analysis.";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Error generating analysis: {0}")]
    Generation(#[from] GenerationError),
    #[error("Error rendering report: {0}")]
    Render(#[from] RenderError),
}

impl ServiceError {
    pub fn status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::Store(StoreError::InvalidDate(_)) => 400,
            ServiceError::Store(StoreError::NotFound(_) | StoreError::NewsNotFound(_)) => 404,
            ServiceError::Store(_) | ServiceError::Generation(_) | ServiceError::Render(_) => 500,
        }
    }

    /// Wire body, `{"detail": "..."}`.
    pub fn body(&self) -> Value {
        json!({ "detail": self.to_string() })
    }
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// `{"iqa": 76.7}` or `{"error": "Missing parameters: OD"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IqaResponse {
    Score { iqa: f64 },
    Incomplete { error: String },
}

impl From<&WqiResult> for IqaResponse {
    fn from(result: &WqiResult) -> Self {
        match result {
            WqiResult::Score(iqa) => IqaResponse::Score { iqa: *iqa },
            WqiResult::Failure(_) => IqaResponse::Incomplete {
                error: result.missing_message().unwrap_or_default(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MonitoringResponse {
    pub monitoring_data: Vec<Value>,
}

/// One sample in an index listing: key columns, normalized values keyed by
/// column (null when missing), then either `iqa` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IqaRow {
    pub city: String,
    pub river: String,
    pub point: String,
    pub date: String,
    #[serde(flatten)]
    pub values: BTreeMap<&'static str, Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iqa: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IqaDataResponse {
    pub iqa_data: Vec<IqaRow>,
}

#[derive(Debug, Serialize)]
pub struct CustomAnalysisResponse {
    pub parameters: Map<String, Value>,
    pub analysis: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iqa: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct NewsResponse {
    pub news: Vec<NewsItem>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Index handlers
// ---------------------------------------------------------------------------

/// Index for a single sample.
pub fn sample_iqa(store: &mut dyn RecordStore, key: &SampleKey) -> Result<IqaResponse, ServiceError> {
    let raw = store.fetch_sample(key).inspect_err(|e| {
        logging::log_store_failure(&key.to_string(), "fetch_sample", e);
    })?;

    let result = compute_wqi(&raw);
    match &result {
        WqiResult::Score(iqa) => {
            logging::debug(DataSource::Core, Some(&key.to_string()), &format!("IQA {:.2}", iqa));
        }
        WqiResult::Failure(missing) => {
            logging::info(
                DataSource::Core,
                Some(&key.to_string()),
                &format!("Cannot score sample: {} parameter(s) missing", missing.len()),
            );
        }
    }
    Ok(IqaResponse::from(&result))
}

pub fn monitoring_data(
    store: &mut dyn RecordStore,
    filter: &MonitoringFilter,
) -> Result<MonitoringResponse, ServiceError> {
    let monitoring_data = store.monitoring_rows(filter).inspect_err(|e| {
        logging::log_store_failure("monitoring", "monitoring_rows", e);
    })?;
    Ok(MonitoringResponse { monitoring_data })
}

/// Every matching sample with its normalized values and index.
pub fn iqa_data(store: &mut dyn RecordStore, filter: &IqaFilter) -> Result<IqaDataResponse, ServiceError> {
    let samples = store.iqa_samples(filter).inspect_err(|e| {
        logging::log_store_failure("iqa", "iqa_samples", e);
    })?;

    let mut rows = Vec::with_capacity(samples.len());
    for sample in samples {
        let normalized = normalize(&sample.raw);
        let result = score(&normalized);
        let values = normalized
            .iter()
            .map(|(p, reading)| (spec_for(p).column, reading.value()))
            .collect();
        rows.push(IqaRow {
            city: sample.city,
            river: sample.river,
            point: sample.point,
            date: sample.date,
            values,
            iqa: result.score(),
            error: result.missing_message(),
        });
    }

    let scored = rows.iter().filter(|r| r.iqa.is_some()).count();
    logging::log_batch_summary(DataSource::Core, rows.len(), scored, rows.len() - scored);
    Ok(IqaDataResponse { iqa_data: rows })
}

// ---------------------------------------------------------------------------
// Generated analyses and reports
// ---------------------------------------------------------------------------

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Generated analysis of user-supplied values. When the values cover all
/// nine parameters the computed index is included in the prompt and the
/// response.
pub fn custom_analysis(
    generator: &dyn TextGenerator,
    request: &AnalysisRequest,
) -> Result<CustomAnalysisResponse, ServiceError> {
    if request.parameters.values().all(is_blank) {
        return Err(ServiceError::BadRequest(EMPTY_ANALYSIS_MESSAGE.to_string()));
    }

    let raw = raw_from_json(&request.parameters);
    if raw.is_empty() {
        logging::debug(
            DataSource::Core,
            Some("custom"),
            "No index parameters in request; analysis will not include an IQA",
        );
    }
    let iqa = compute_wqi(&raw).score();
    let prompt = build_custom_analysis_prompt(request, iqa);
    let analysis = generator.complete(&prompt).inspect_err(|e| {
        logging::log_generation_failure("custom", "custom_analysis", e);
    })?;

    Ok(CustomAnalysisResponse {
        parameters: request.parameters.clone(),
        analysis,
        iqa,
    })
}

/// Report text for a sample: key, index (or what is missing), each
/// parameter with its sub-index, and the generated analysis.
pub fn report_text(
    key: &SampleKey,
    normalized: &NormalizedMeasurement,
    result: &WqiResult,
    analysis: &str,
) -> String {
    let mut lines = vec![
        format!("City: {}", key.city),
        format!("River: {}", key.river),
        format!("Collection point: {}", key.point),
        format!("Collection date: {}", key.date),
        String::new(),
    ];

    match result {
        WqiResult::Score(iqa) => lines.push(format!(
            "IQA: {:.2} ({})",
            iqa,
            QualityBand::classify(*iqa).label()
        )),
        WqiResult::Failure(_) => lines.push(format!(
            "IQA: not computed. {}",
            result.missing_message().unwrap_or_default()
        )),
    }
    lines.push(String::new());

    let sub_indices = SubIndices::from_normalized(normalized).ok();
    for (parameter, reading) in normalized.iter() {
        let spec = spec_for(parameter);
        let value = match reading.value() {
            Some(v) => format!("{} {}", v, spec.unit).trim_end().to_string(),
            None => "missing".to_string(),
        };
        let qi = sub_indices
            .as_ref()
            .map(|qi| format!(" (qi {})", qi.get(parameter)))
            .unwrap_or_default();
        lines.push(format!("{} ({}): {}{}", spec.label, parameter, value, qi));
    }

    lines.push(String::new());
    lines.push("Analysis:".to_string());
    lines.push(analysis.to_string());
    lines.join("\n")
}

/// PDF report for a single sample.
pub fn sample_report(
    store: &mut dyn RecordStore,
    generator: &dyn TextGenerator,
    renderer: &dyn ReportRenderer,
    key: &SampleKey,
) -> Result<Vec<u8>, ServiceError> {
    let key_label = key.to_string();
    let raw = store.fetch_sample(key).inspect_err(|e| {
        logging::log_store_failure(&key_label, "fetch_sample", e);
    })?;

    let normalized = normalize(&raw);
    let result = score(&normalized);
    let bundle = build_sample_bundle(key, &normalized, &result);

    let analysis = generator.generate_summary(&bundle, "sample report").inspect_err(|e| {
        logging::log_generation_failure(&key_label, "generate_summary", e);
    })?;

    let text = report_text(key, &normalized, &result, &analysis);
    let bytes = renderer.render_report(&text).inspect_err(|e| {
        logging::log_render_failure(&key_label, "render_report", e);
    })?;

    logging::info(
        DataSource::Renderer,
        Some(&key_label),
        &format!("Rendered report ({} bytes)", bytes.len()),
    );
    Ok(bytes)
}

// ---------------------------------------------------------------------------
// News handlers
// ---------------------------------------------------------------------------

pub fn list_news(store: &mut dyn RecordStore) -> Result<NewsResponse, ServiceError> {
    Ok(NewsResponse {
        news: store.list_news()?,
    })
}

pub fn get_news(store: &mut dyn RecordStore, id: i64) -> Result<NewsItem, ServiceError> {
    Ok(store.get_news(id)?)
}

pub fn create_news(store: &mut dyn RecordStore, item: &NewsItem) -> Result<MessageResponse, ServiceError> {
    store.create_news(item)?;
    Ok(MessageResponse::new("News item created successfully."))
}

pub fn update_news(
    store: &mut dyn RecordStore,
    id: i64,
    item: &NewsItem,
) -> Result<MessageResponse, ServiceError> {
    store.update_news(id, item)?;
    Ok(MessageResponse::new("News item updated successfully."))
}

pub fn delete_news(store: &mut dyn RecordStore, id: i64) -> Result<MessageResponse, ServiceError> {
    store.delete_news(id)?;
    Ok(MessageResponse::new("News item deleted successfully."))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
