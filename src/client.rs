use std::borrow::Cow;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use ureq::Agent;

use crate::billing::{parse_billing_response, BillingRecord};
use crate::dates::DateQuery;
use crate::error::{IftaError, Result};
use crate::request::{date_query_key, BillingQuery, ReportRunRequest};
use crate::table::{parse_csv, rows_from_json, ReportTable, TabularRow};

pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Blocking HTTP seam. Bodies go out and come back as raw text.
pub trait Transport {
    fn get(&self, url: &str) -> Result<String>;
    fn post_json(&self, url: &str, body: &str, headers: &[(&str, &str)]) -> Result<String>;
}

pub struct HttpTransport {
    agent: Agent,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(timeout)
            .build()
            .into();
        Self { agent }
    }
}

fn request_error(url: &str, err: ureq::Error) -> IftaError {
    match err {
        ureq::Error::StatusCode(status) => IftaError::HttpStatus {
            url: url.to_string(),
            status,
        },
        other => IftaError::Network {
            url: url.to_string(),
            reason: other.to_string(),
        },
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<String> {
        let mut response = self
            .agent
            .get(url)
            .header("Accept", "application/json")
            .call()
            .map_err(|e| request_error(url, e))?;
        response
            .body_mut()
            .read_to_string()
            .map_err(|e| request_error(url, e))
    }

    fn post_json(&self, url: &str, body: &str, headers: &[(&str, &str)]) -> Result<String> {
        let mut request = self
            .agent
            .post(url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let mut response = request.send(body).map_err(|e| request_error(url, e))?;
        response
            .body_mut()
            .read_to_string()
            .map_err(|e| request_error(url, e))
    }
}

/// Per-user values the backend expects echoed back, read once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub csrf_token: Option<String>,
}

impl Session {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            csrf_token: Some(token.into()),
        }
    }

    /// Pick the CSRF token out of a `Cookie:` style header value.
    pub fn from_cookie_header(cookies: &str) -> Self {
        Self {
            csrf_token: cookie_value(cookies, CSRF_COOKIE),
        }
    }

    fn post_headers(&self) -> Vec<(&str, &str)> {
        self.csrf_token
            .as_deref()
            .map(|token| vec![(CSRF_HEADER, token)])
            .unwrap_or_default()
    }
}

/// Value of cookie `name` in a `a=1; b=2` string, percent-decoded.
/// A value that does not decode to UTF-8 counts as absent.
pub fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix(name)?.strip_prefix('='))
        .and_then(|value| urlencoding::decode(value).ok().map(Cow::into_owned))
}

/// Result of a report run: the CSV exactly as the backend sent it, and its parsed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub csv_text: String,
    pub table: ReportTable,
}

impl RunReport {
    pub fn from_envelope(body: &str) -> Result<Self> {
        let csv_text = csv_from_envelope(body)?;
        let table = parse_csv(&csv_text)?;
        Ok(Self { csv_text, table })
    }
}

/// Pull the `text` field out of a run-job response.
///
/// The backend encodes the envelope twice, so the body is usually a JSON string
/// holding the object. A bare object is accepted too.
pub fn csv_from_envelope(body: &str) -> Result<String> {
    let value = match serde_json::from_str::<Value>(body)? {
        Value::String(inner) => serde_json::from_str(&inner)?,
        other => other,
    };

    match value.get("text").and_then(Value::as_str) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(IftaError::MalformedResponse(
            "CSV data is undefined or empty".to_string(),
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    #[serde(rename = "API_BASE_URL")]
    pub api_base_url: String,
}

#[derive(Deserialize)]
struct CompaniesResponse {
    companies: Vec<String>,
}

/// Typed access to the reporting backend
pub struct ApiClient<T: Transport> {
    transport: T,
    base_url: String,
    session: Session,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, base_url: impl Into<String>, session: Session) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn post(&self, path: &str, body: &str) -> Result<String> {
        let url = self.url(path);
        if self.session.csrf_token.is_none() {
            log::warn!("posting to {url} without a CSRF token");
        }
        log::debug!("POST {url} {body}");
        self.transport
            .post_json(&url, body, &self.session.post_headers())
    }

    fn get(&self, path: &str) -> Result<String> {
        let url = self.url(path);
        log::debug!("GET {url}");
        self.transport.get(&url)
    }

    /// `POST api/run-job/`
    pub fn run_report(&self, request: &ReportRunRequest) -> Result<RunReport> {
        log::info!("requesting report for {}", request.date);
        let body = self.post("api/run-job/", &request.to_json()?)?;
        let report = RunReport::from_envelope(&body)?;
        log::info!("report for {} has {} rows", request.date, report.table.len());
        Ok(report)
    }

    /// `GET api/entries/{YYYY-MM-DD}/`. An empty list means nothing is stored for that day.
    pub fn fetch_entries_for_date(&self, query: &DateQuery) -> Result<Vec<TabularRow>> {
        let key = date_query_key(query);
        let body = self.get(&format!("api/entries/{key}/"))?;
        let rows = rows_from_json(serde_json::from_str(&body)?)?;
        log::info!("{} stored entries for {key}", rows.len());
        Ok(rows)
    }

    /// `POST api/bills/`
    pub fn fetch_billing(&self, query: &BillingQuery) -> Result<Vec<(String, BillingRecord)>> {
        let body = self.post("api/bills/", &query.to_json()?)?;
        let records = parse_billing_response(&body)?;
        log::info!(
            "{} billing records for {}-{:02}",
            records.len(),
            query.year,
            query.month
        );
        Ok(records)
    }

    /// `GET api/config/`
    pub fn fetch_server_config(&self) -> Result<ServerConfig> {
        let body = self.get("api/config/")?;
        Ok(serde_json::from_str(&body)?)
    }

    /// `GET billing/companies/`
    pub fn fetch_companies(&self) -> Result<Vec<String>> {
        let body = self.get("billing/companies/")?;
        let response: CompaniesResponse = serde_json::from_str(&body)?;
        Ok(response.companies)
    }
}
