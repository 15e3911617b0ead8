/// Handler pipeline tests
///
/// Drive the service handlers end to end against in-memory collaborators:
/// a map-backed record store, a canned text generator and a renderer that
/// echoes its input. No database or network access is needed.

use std::cell::RefCell;
use std::collections::BTreeMap;

use serde_json::{Value, json};

use tikatu_service::db::RecordStore;
use tikatu_service::model::{
    AnalysisRequest, GenerationError, IqaFilter, MonitoringFilter, NewsItem, Parameter,
    RawMeasurement, RawValue, RenderError, SampleKey, SampleRecord, StoreError,
};
use tikatu_service::report::{PdfRenderer, ReportRenderer};
use tikatu_service::service::{self, IqaResponse, ServiceError};
use tikatu_service::summary::TextGenerator;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryStore {
    samples: Vec<SampleRecord>,
    news: BTreeMap<i64, NewsItem>,
}

impl MemoryStore {
    fn matches(record: &SampleRecord, city: &Option<String>, river: &Option<String>, points: &[String]) -> bool {
        city.as_ref().is_none_or(|c| *c == record.city)
            && river.as_ref().is_none_or(|r| *r == record.river)
            && (points.is_empty() || points.contains(&record.point))
    }
}

impl RecordStore for MemoryStore {
    fn fetch_sample(&mut self, key: &SampleKey) -> Result<RawMeasurement, StoreError> {
        self.samples
            .iter()
            .find(|s| s.city == key.city && s.river == key.river && s.point == key.point && s.date == key.date)
            .map(|s| s.raw.clone())
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    fn monitoring_rows(&mut self, filter: &MonitoringFilter) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .samples
            .iter()
            .filter(|s| Self::matches(s, &filter.city, &filter.river, &filter.points))
            .map(|s| json!({"city": s.city, "river": s.river, "point": s.point, "collection_date": s.date}))
            .collect())
    }

    fn iqa_samples(&mut self, filter: &IqaFilter) -> Result<Vec<SampleRecord>, StoreError> {
        Ok(self
            .samples
            .iter()
            .filter(|s| Self::matches(s, &filter.city, &filter.river, &filter.points))
            .cloned()
            .collect())
    }

    fn list_news(&mut self) -> Result<Vec<NewsItem>, StoreError> {
        Ok(self.news.values().cloned().collect())
    }

    fn get_news(&mut self, id: i64) -> Result<NewsItem, StoreError> {
        self.news.get(&id).cloned().ok_or(StoreError::NewsNotFound(id))
    }

    fn create_news(&mut self, item: &NewsItem) -> Result<(), StoreError> {
        let id = self.news.keys().next_back().copied().unwrap_or(0) + 1;
        self.news.insert(id, NewsItem { id: Some(id), ..item.clone() });
        Ok(())
    }

    fn update_news(&mut self, id: i64, item: &NewsItem) -> Result<(), StoreError> {
        match self.news.get_mut(&id) {
            Some(existing) => {
                *existing = NewsItem { id: Some(id), ..item.clone() };
                Ok(())
            }
            None => Err(StoreError::NewsNotFound(id)),
        }
    }

    fn delete_news(&mut self, id: i64) -> Result<(), StoreError> {
        self.news.remove(&id).map(|_| ()).ok_or(StoreError::NewsNotFound(id))
    }
}

/// Records every prompt and answers with a fixed text, or fails.
struct CannedGenerator {
    reply: Result<String, u16>,
    prompts: RefCell<Vec<String>>,
}

impl CannedGenerator {
    fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    fn failing(status: u16) -> Self {
        Self {
            reply: Err(status),
            prompts: RefCell::new(Vec::new()),
        }
    }
}

impl TextGenerator for CannedGenerator {
    fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.reply.clone().map_err(GenerationError::Http)
    }
}

/// Returns the report text as bytes so tests can inspect it.
struct EchoRenderer;

impl ReportRenderer for EchoRenderer {
    fn render_report(&self, text: &str) -> Result<Vec<u8>, RenderError> {
        Ok(text.as_bytes().to_vec())
    }
}

fn text(s: &str) -> RawValue {
    RawValue::Text(s.to_string())
}

/// The reference sample: every parameter in its good tier, stored the way
/// the field team types it.
fn clean_raw() -> RawMeasurement {
    RawMeasurement::new()
        .with(Parameter::Od, text("8,0"))
        .with(Parameter::Coliformes, text("500"))
        .with(Parameter::Dbo, text("3"))
        .with(Parameter::NitrogenioTotal, text("5"))
        .with(Parameter::FosforoTotal, text("0,05"))
        .with(Parameter::Turbidez, text("5 NTU"))
        .with(Parameter::Tds, text("300"))
        .with(Parameter::Ph, text("7,0"))
        .with(Parameter::Temperatura, text("22"))
}

fn record(point: &str, date: &str, raw: RawMeasurement) -> SampleRecord {
    SampleRecord {
        city: "Blumenau".to_string(),
        river: "Itajai-Acu".to_string(),
        point: point.to_string(),
        date: date.to_string(),
        raw,
    }
}

fn key(point: &str, date: &str) -> SampleKey {
    SampleKey {
        city: "Blumenau".to_string(),
        river: "Itajai-Acu".to_string(),
        point: point.to_string(),
        date: date.to_string(),
    }
}

fn seeded_store() -> MemoryStore {
    let incomplete = clean_raw()
        .with(Parameter::Od, RawValue::Null)
        .with(Parameter::Ph, text("n/a"));
    MemoryStore {
        samples: vec![
            record("P1", "2024-03-18", clean_raw()),
            record("P2", "2024-03-18", incomplete),
        ],
        news: BTreeMap::new(),
    }
}

fn news(title: &str) -> NewsItem {
    NewsItem {
        id: None,
        title: title.to_string(),
        summary: "summary".to_string(),
        content: "content".to_string(),
        date: Some("2024-03-20".to_string()),
        image_url: None,
    }
}

// ---------------------------------------------------------------------------
// Index endpoints
// ---------------------------------------------------------------------------

#[test]
fn test_sample_iqa_scores_complete_sample() {
    let mut store = seeded_store();
    let response = service::sample_iqa(&mut store, &key("P1", "2024-03-18")).expect("sample exists");
    match response {
        IqaResponse::Score { iqa } => assert!((iqa - 76.7).abs() < 1e-9, "got {}", iqa),
        other => panic!("expected a score, got {:?}", other),
    }
}

#[test]
fn test_sample_iqa_wire_text_is_the_unrounded_weighted_mean() {
    // The nine weights sum to 0.9999999999999999 in f64 and the score is
    // divided by that sum without rounding, so the body carries the float
    // exactly as computed.
    let mut store = seeded_store();
    let response = service::sample_iqa(&mut store, &key("P1", "2024-03-18")).unwrap();
    assert_eq!(serde_json::to_string(&response).unwrap(), r#"{"iqa":76.70000000000002}"#);
}

#[test]
fn test_sample_iqa_reports_missing_parameters_in_order() {
    let mut store = seeded_store();
    let response = service::sample_iqa(&mut store, &key("P2", "2024-03-18")).expect("sample exists");
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"error": "Missing parameters: OD, pH"})
    );
}

#[test]
fn test_sample_iqa_unknown_key_is_not_found_not_missing() {
    let mut store = seeded_store();
    let err = service::sample_iqa(&mut store, &key("P9", "2024-03-18")).unwrap_err();
    assert!(matches!(err, ServiceError::Store(StoreError::NotFound(_))), "got {:?}", err);
    assert_eq!(err.status(), 404);
}

#[test]
fn test_sample_iqa_is_repeatable() {
    let mut store = seeded_store();
    let first = service::sample_iqa(&mut store, &key("P1", "2024-03-18")).unwrap();
    let second = service::sample_iqa(&mut store, &key("P1", "2024-03-18")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_iqa_data_lists_every_sample_with_its_outcome() {
    let mut store = seeded_store();
    let response = service::iqa_data(&mut store, &IqaFilter::default()).unwrap();
    let json = serde_json::to_value(&response).unwrap();
    let rows = json["iqa_data"].as_array().expect("array of rows");
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0]["point"], json!("P1"));
    assert_eq!(rows[0]["od"], json!(8.0));
    assert_eq!(rows[0]["turbidity"], json!(5.0));
    assert!(rows[0].get("error").is_none());
    assert!((rows[0]["iqa"].as_f64().unwrap() - 76.7).abs() < 1e-9);

    assert_eq!(rows[1]["point"], json!("P2"));
    assert_eq!(rows[1]["od"], Value::Null);
    assert_eq!(rows[1]["error"], json!("Missing parameters: OD, pH"));
    assert!(rows[1].get("iqa").is_none());
}

#[test]
fn test_iqa_data_filters_by_point() {
    let mut store = seeded_store();
    let filter = IqaFilter {
        points: vec!["P2".to_string()],
        ..Default::default()
    };
    let response = service::iqa_data(&mut store, &filter).unwrap();
    assert_eq!(response.iqa_data.len(), 1);
    assert_eq!(response.iqa_data[0].point, "P2");
}

#[test]
fn test_monitoring_data_wraps_rows() {
    let mut store = seeded_store();
    let filter = MonitoringFilter {
        city: Some("Blumenau".to_string()),
        ..Default::default()
    };
    let json = serde_json::to_value(service::monitoring_data(&mut store, &filter).unwrap()).unwrap();
    assert_eq!(json["monitoring_data"].as_array().map(Vec::len), Some(2));

    let elsewhere = MonitoringFilter {
        city: Some("Joinville".to_string()),
        ..Default::default()
    };
    let json = serde_json::to_value(service::monitoring_data(&mut store, &elsewhere).unwrap()).unwrap();
    assert_eq!(json, json!({"monitoring_data": []}));
}

// ---------------------------------------------------------------------------
// Custom analysis
// ---------------------------------------------------------------------------

#[test]
fn test_custom_analysis_rejects_empty_parameters_before_generating() {
    let generator = CannedGenerator::replying("unused");
    let mut request = AnalysisRequest::default();
    request.parameters.insert("pH".to_string(), Value::Null);
    request.parameters.insert("OD".to_string(), json!(""));

    let err = service::custom_analysis(&generator, &request).unwrap_err();
    assert_eq!(err.status(), 400);
    assert_eq!(err.to_string(), service::EMPTY_ANALYSIS_MESSAGE);
    assert!(generator.prompts.borrow().is_empty(), "generator must not be called");

    let err = service::custom_analysis(&generator, &AnalysisRequest::default()).unwrap_err();
    assert_eq!(err.status(), 400);
}

#[test]
fn test_custom_analysis_passes_generated_text_through() {
    let generator = CannedGenerator::replying("Moderate turbidity; suitable for irrigation.");
    let mut request = AnalysisRequest {
        collection_site: Some("river".to_string()),
        ..Default::default()
    };
    request.parameters.insert("turbidity".to_string(), json!("12,5"));

    let response = service::custom_analysis(&generator, &request).unwrap();
    assert_eq!(response.analysis, "Moderate turbidity; suitable for irrigation.");
    assert_eq!(response.iqa, None, "one parameter is not enough to score");

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["parameters"], json!({"turbidity": "12,5"}));
    assert!(json.get("iqa").is_none());

    let prompts = generator.prompts.borrow();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("- turbidity: 12,5"));
}

#[test]
fn test_custom_analysis_includes_index_when_complete() {
    let generator = CannedGenerator::replying("Good water.");
    let mut request = AnalysisRequest::default();
    for (name, value) in [
        ("OD", json!(8)),
        ("COLIFORMES", json!(500)),
        ("DBO", json!("3")),
        ("NITROGENIO_TOTAL", json!(5)),
        ("FOSFORO_TOTAL", json!("0,05")),
        ("TURBIDEZ", json!(5)),
        ("TDS", json!(300)),
        ("pH", json!("7.0")),
        ("TEMPERATURA", json!(22)),
    ] {
        request.parameters.insert(name.to_string(), value);
    }

    let response = service::custom_analysis(&generator, &request).unwrap();
    let iqa = response.iqa.expect("all nine present");
    assert!((iqa - 76.7).abs() < 1e-9);
    assert!(generator.prompts.borrow()[0].contains("IQA): 76.7 (Good)"));
}

#[test]
fn test_custom_analysis_generation_failure_is_distinct() {
    let generator = CannedGenerator::failing(503);
    let mut request = AnalysisRequest::default();
    request.parameters.insert("pH".to_string(), json!(7.1));

    let err = service::custom_analysis(&generator, &request).unwrap_err();
    assert!(matches!(err, ServiceError::Generation(GenerationError::Http(503))));
    assert_eq!(err.status(), 500);
    assert_eq!(err.to_string(), "Error generating analysis: HTTP error: 503");
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[test]
fn test_sample_report_combines_score_values_and_analysis() {
    let mut store = seeded_store();
    let generator = CannedGenerator::replying("The river is in good shape.");
    let bytes = service::sample_report(&mut store, &generator, &EchoRenderer, &key("P1", "2024-03-18"))
        .expect("report should render");
    let report = String::from_utf8(bytes).unwrap();

    assert!(report.contains("IQA: 76.70 (Good)"));
    assert!(report.contains("Fecal coliforms (COLIFORMES): 500 NMP/100mL (qi 70)"));
    assert!(report.ends_with("The river is in good shape."));

    let prompts = generator.prompts.borrow();
    assert!(prompts[0].starts_with("Context: sample report."));
    assert!(prompts[0].contains("\"band\": \"Good\""));
    assert!(!prompts[0].contains("\"missing\""));
}

#[test]
fn test_sample_report_for_incomplete_sample_still_renders() {
    let mut store = seeded_store();
    let generator = CannedGenerator::replying("Two parameters are missing.");
    let bytes = service::sample_report(&mut store, &generator, &EchoRenderer, &key("P2", "2024-03-18"))
        .expect("incomplete data is not an error");
    let report = String::from_utf8(bytes).unwrap();
    assert!(report.contains("IQA: not computed. Missing parameters: OD, pH"));
    assert!(report.contains("Dissolved oxygen (OD): missing"));
}

#[test]
fn test_sample_report_renders_real_pdf() {
    let mut store = seeded_store();
    let generator = CannedGenerator::replying("Fine.");
    let bytes = service::sample_report(
        &mut store,
        &generator,
        &PdfRenderer::default(),
        &key("P1", "2024-03-18"),
    )
    .unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn test_sample_report_unknown_key_skips_generation() {
    let mut store = seeded_store();
    let generator = CannedGenerator::replying("unused");
    let err = service::sample_report(&mut store, &generator, &EchoRenderer, &key("P1", "1999-01-01"))
        .unwrap_err();
    assert_eq!(err.status(), 404);
    assert!(generator.prompts.borrow().is_empty());
}

// ---------------------------------------------------------------------------
// News
// ---------------------------------------------------------------------------

#[test]
fn test_news_lifecycle() {
    let mut store = MemoryStore::default();

    let created = service::create_news(&mut store, &news("Cheia no Itajaí")).unwrap();
    assert_eq!(created.message, "News item created successfully.");

    let listed = service::list_news(&mut store).unwrap();
    assert_eq!(listed.news.len(), 1);
    let id = listed.news[0].id.expect("store assigns ids");

    let updated = service::update_news(&mut store, id, &news("Cheia controlada")).unwrap();
    assert_eq!(updated.message, "News item updated successfully.");
    assert_eq!(service::get_news(&mut store, id).unwrap().title, "Cheia controlada");

    let deleted = service::delete_news(&mut store, id).unwrap();
    assert_eq!(deleted.message, "News item deleted successfully.");

    let err = service::get_news(&mut store, id).unwrap_err();
    assert_eq!(err.status(), 404);
    assert_eq!(err.body(), json!({"detail": "News item not found."}));
}

#[test]
fn test_news_update_and_delete_of_unknown_id_are_not_found() {
    let mut store = MemoryStore::default();
    assert_eq!(service::update_news(&mut store, 42, &news("x")).unwrap_err().status(), 404);
    assert_eq!(service::delete_news(&mut store, 42).unwrap_err().status(), 404);
}
