/// Record store for monitoring samples and news articles.
///
/// `RecordStore` is the seam the handlers depend on; `PgStore` implements it
/// over a blocking `postgres::Client`. Parameter values are selected as
/// text (`col::text`) so that numeric and free-text columns both reach the
/// normalizer unchanged.
///
/// Hosted databases are reached over rustls with the webpki root set when
/// the URL asks for it (`sslmode=require`) or `[database] tls` is set;
/// local URLs keep connecting in plain text.
///
/// Expected tables:
///   monitoring_data(city, river, point, collection_date date,
///                   od, coliforms, dbo, total_nitrogen, total_phosphorus,
///                   turbidity, tds, ph, temperature, ...)
///   news(id serial, title, summary, content, date date, image_url)

use std::sync::Arc;

use chrono::NaiveDate;
use postgres::config::SslMode;
use postgres::types::ToSql;
use postgres::{Client, Config, NoTls, Row};
use tokio_postgres_rustls::MakeRustlsConnect;

use crate::logging::{self, DataSource};
use crate::model::{
    IqaFilter, MonitoringFilter, NewsItem, Parameter, RawMeasurement, RawValue, SampleKey,
    SampleRecord, StoreError,
};
use crate::parameters::{all_columns, spec_for};

// ---------------------------------------------------------------------------
// Store interface
// ---------------------------------------------------------------------------

pub trait RecordStore {
    /// Raw parameter values for the single sample matching `key`.
    fn fetch_sample(&mut self, key: &SampleKey) -> Result<RawMeasurement, StoreError>;

    /// Full monitoring rows, as JSON objects keyed by column name.
    fn monitoring_rows(&mut self, filter: &MonitoringFilter) -> Result<Vec<serde_json::Value>, StoreError>;

    /// Samples with their raw parameter values, ordered by date.
    fn iqa_samples(&mut self, filter: &IqaFilter) -> Result<Vec<SampleRecord>, StoreError>;

    fn list_news(&mut self) -> Result<Vec<NewsItem>, StoreError>;
    fn get_news(&mut self, id: i64) -> Result<NewsItem, StoreError>;
    fn create_news(&mut self, item: &NewsItem) -> Result<(), StoreError>;
    fn update_news(&mut self, id: i64, item: &NewsItem) -> Result<(), StoreError>;
    fn delete_news(&mut self, id: i64) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Query building
// ---------------------------------------------------------------------------

/// Parses an ISO `YYYY-MM-DD` date.
pub fn parse_date(date: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| StoreError::InvalidDate(date.to_string()))
}

/// A WHERE clause under construction, with positional parameters.
pub struct SqlQuery {
    pub sql: String,
    params: Vec<Box<dyn ToSql + Sync>>,
}

impl SqlQuery {
    fn new(base: &str) -> Self {
        Self {
            sql: format!("{} WHERE 1=1", base),
            params: Vec::new(),
        }
    }

    /// Appends `condition`, replacing `{}` with the next placeholder.
    fn push<T: ToSql + Sync + 'static>(&mut self, condition: &str, value: T) {
        self.params.push(Box::new(value));
        let placeholder = format!("${}", self.params.len());
        self.sql.push_str(" AND ");
        self.sql.push_str(&condition.replace("{}", &placeholder));
    }

    fn push_raw(&mut self, condition: &str) {
        self.sql.push_str(" AND ");
        self.sql.push_str(condition);
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}

fn parameter_select_list() -> String {
    all_columns()
        .iter()
        .map(|c| format!("{}::text", c))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn build_sample_query(key: &SampleKey) -> Result<SqlQuery, StoreError> {
    let date = parse_date(&key.date)?;
    let mut query = SqlQuery::new(&format!(
        "SELECT {} FROM monitoring_data",
        parameter_select_list()
    ));
    query.push("city = {}", key.city.clone());
    query.push("river = {}", key.river.clone());
    query.push("point = {}", key.point.clone());
    query.push("collection_date = {}", date);
    Ok(query)
}

pub fn build_monitoring_query(filter: &MonitoringFilter) -> Result<SqlQuery, StoreError> {
    let mut query = SqlQuery::new("SELECT row_to_json(m)::text FROM monitoring_data m");

    if let Some(city) = &filter.city {
        query.push("city = {}", city.clone());
    }
    if let Some(river) = &filter.river {
        query.push("river = {}", river.clone());
    }
    if let Some(parameter) = filter.parameter {
        // Column names come from the closed registry, never from the caller.
        query.push_raw(&format!("{} IS NOT NULL", spec_for(parameter).column));
    }
    if !filter.points.is_empty() {
        query.push("point = ANY({})", filter.points.clone());
    }

    let start = filter.start_date.as_deref().map(parse_date).transpose()?;
    let end = filter.end_date.as_deref().map(parse_date).transpose()?;
    match (start, end) {
        (Some(start), Some(end)) => {
            query.push("collection_date >= {}", start);
            query.push("collection_date <= {}", end);
        }
        (Some(start), None) => query.push("collection_date >= {}", start),
        (None, Some(end)) => query.push("collection_date <= {}", end),
        (None, None) => {}
    }

    query.sql.push_str(" ORDER BY collection_date");
    Ok(query)
}

pub fn build_iqa_query(filter: &IqaFilter) -> SqlQuery {
    let mut query = SqlQuery::new(&format!(
        "SELECT city, river, point, collection_date::text, {} FROM monitoring_data",
        parameter_select_list()
    ));
    if let Some(city) = &filter.city {
        query.push("city = {}", city.clone());
    }
    if let Some(river) = &filter.river {
        query.push("river = {}", river.clone());
    }
    if !filter.points.is_empty() {
        query.push("point = ANY({})", filter.points.clone());
    }
    query.sql.push_str(" ORDER BY collection_date, point");
    query
}

/// Reads the nine parameter columns starting at `offset`.
fn raw_from_row(row: &Row, offset: usize) -> Result<RawMeasurement, StoreError> {
    let mut raw = RawMeasurement::new();
    for parameter in Parameter::ALL {
        let value: Option<String> = row
            .try_get(offset + parameter.index())
            .map_err(|e| StoreError::Decode(format!("{}: {}", spec_for(parameter).column, e)))?;
        raw.insert(parameter, value.map(RawValue::Text).unwrap_or(RawValue::Null));
    }
    Ok(raw)
}

fn text_column(row: &Row, idx: usize) -> Result<String, StoreError> {
    row.try_get::<_, Option<String>>(idx)
        .map(Option::unwrap_or_default)
        .map_err(|e| StoreError::Decode(e.to_string()))
}

fn news_from_row(row: &Row) -> Result<NewsItem, StoreError> {
    let decode = |e: postgres::Error| StoreError::Decode(e.to_string());
    Ok(NewsItem {
        id: row.try_get(0).map_err(decode)?,
        title: text_column(row, 1)?,
        summary: text_column(row, 2)?,
        content: text_column(row, 3)?,
        date: row.try_get(4).map_err(decode)?,
        image_url: row.try_get(5).map_err(decode)?,
    })
}

const NEWS_COLUMNS: &str = "id::bigint, title, summary, content, date::text, image_url";

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

fn connection_error(e: impl std::fmt::Display) -> StoreError {
    StoreError::Connection(e.to_string())
}

/// Whether a connection with `config` must be encrypted. `disable` and
/// `prefer` (the default) stay plain text unless `tls` says otherwise.
pub fn requires_tls(config: &Config, tls: Option<bool>) -> bool {
    tls.unwrap_or_else(|| !matches!(config.get_ssl_mode(), SslMode::Disable | SslMode::Prefer))
}

/// rustls client trusting the webpki roots, for hosted databases.
pub fn rustls_connector() -> Result<MakeRustlsConnect, StoreError> {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(connection_error)?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(MakeRustlsConnect::new(config))
}

// ---------------------------------------------------------------------------
// PostgreSQL store
// ---------------------------------------------------------------------------

pub struct PgStore {
    client: Client,
}

impl PgStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connects, choosing TLS from the URL's `sslmode`.
    pub fn connect(url: &str) -> Result<Self, StoreError> {
        Self::connect_with(url, None)
    }

    /// Connects and checks that both tables are reachable. `tls` overrides
    /// the URL: `Some(true)` forces an encrypted connection, `Some(false)`
    /// forces plain text.
    pub fn connect_with(url: &str, tls: Option<bool>) -> Result<Self, StoreError> {
        let mut config: Config = url.parse().map_err(connection_error)?;

        let encrypted = requires_tls(&config, tls);
        match tls {
            Some(true) => config.ssl_mode(SslMode::Require),
            Some(false) => config.ssl_mode(SslMode::Disable),
            None => &mut config,
        };

        let mut client = if encrypted {
            config.connect(rustls_connector()?)
        } else {
            config.connect(NoTls)
        }
        .map_err(connection_error)?;

        for table in ["monitoring_data", "news"] {
            let row = client
                .query_one(
                    "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)",
                    &[&table],
                )
                .map_err(connection_error)?;
            if !row.get::<_, bool>(0) {
                return Err(StoreError::Connection(format!("table '{}' does not exist", table)));
            }
        }

        logging::debug(
            DataSource::Store,
            None,
            if encrypted { "Connected to record store (TLS)" } else { "Connected to record store" },
        );
        Ok(Self::new(client))
    }
}

impl RecordStore for PgStore {
    fn fetch_sample(&mut self, key: &SampleKey) -> Result<RawMeasurement, StoreError> {
        let query = build_sample_query(key)?;
        let rows = self.client.query(query.sql.as_str(), &query.params())?;

        let row = rows.first().ok_or_else(|| StoreError::NotFound(key.clone()))?;
        if rows.len() > 1 {
            logging::warn(
                DataSource::Store,
                Some(&key.to_string()),
                &format!("{} rows match sample key; using the first", rows.len()),
            );
        }
        raw_from_row(row, 0)
    }

    fn monitoring_rows(&mut self, filter: &MonitoringFilter) -> Result<Vec<serde_json::Value>, StoreError> {
        let query = build_monitoring_query(filter)?;
        let rows = self.client.query(query.sql.as_str(), &query.params())?;

        rows.iter()
            .map(|row| {
                let json: String = row.try_get(0).map_err(|e| StoreError::Decode(e.to_string()))?;
                serde_json::from_str(&json).map_err(|e| StoreError::Decode(e.to_string()))
            })
            .collect()
    }

    fn iqa_samples(&mut self, filter: &IqaFilter) -> Result<Vec<SampleRecord>, StoreError> {
        let query = build_iqa_query(filter);
        let rows = self.client.query(query.sql.as_str(), &query.params())?;

        rows.iter()
            .map(|row| {
                Ok(SampleRecord {
                    city: text_column(row, 0)?,
                    river: text_column(row, 1)?,
                    point: text_column(row, 2)?,
                    date: text_column(row, 3)?,
                    raw: raw_from_row(row, 4)?,
                })
            })
            .collect()
    }

    fn list_news(&mut self) -> Result<Vec<NewsItem>, StoreError> {
        let sql = format!("SELECT {} FROM news ORDER BY id", NEWS_COLUMNS);
        let rows = self.client.query(sql.as_str(), &[])?;
        rows.iter().map(news_from_row).collect()
    }

    fn get_news(&mut self, id: i64) -> Result<NewsItem, StoreError> {
        let sql = format!("SELECT {} FROM news WHERE id = $1", NEWS_COLUMNS);
        let row = self
            .client
            .query_opt(sql.as_str(), &[&id])?
            .ok_or(StoreError::NewsNotFound(id))?;
        news_from_row(&row)
    }

    fn create_news(&mut self, item: &NewsItem) -> Result<(), StoreError> {
        self.client.execute(
            "INSERT INTO news (title, summary, content, date, image_url)
             VALUES ($1, $2, $3, $4::text::date, $5)",
            &[&item.title, &item.summary, &item.content, &item.date, &item.image_url],
        )?;
        Ok(())
    }

    fn update_news(&mut self, id: i64, item: &NewsItem) -> Result<(), StoreError> {
        let updated = self.client.execute(
            "UPDATE news
             SET title = $1, summary = $2, content = $3, date = $4::text::date, image_url = $5
             WHERE id = $6",
            &[&item.title, &item.summary, &item.content, &item.date, &item.image_url, &id],
        )?;
        if updated == 0 {
            return Err(StoreError::NewsNotFound(id));
        }
        Ok(())
    }

    fn delete_news(&mut self, id: i64) -> Result<(), StoreError> {
        let deleted = self.client.execute("DELETE FROM news WHERE id = $1", &[&id])?;
        if deleted == 0 {
            return Err(StoreError::NewsNotFound(id));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
