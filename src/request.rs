use chrono::NaiveDate;
use serde::Serialize;

use crate::dates::DateQuery;
use crate::error::{IftaError, Result};

/// Boolean switches sent along with a report run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunOptions {
    pub remove_unchanged: bool,
    pub send_email: bool,
    pub save_to_db: bool,
    pub send_to_ftp: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            remove_unchanged: false,
            send_email: false,
            save_to_db: true,
            send_to_ftp: false,
        }
    }
}

/// Body of `POST api/run-job/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRunRequest {
    /// Serialized as `YYYY-MM-DD`
    pub date: NaiveDate,
    #[serde(flatten)]
    pub options: RunOptions,
}

impl ReportRunRequest {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Build the run-job payload. A missing date is rejected before anything is sent.
///
/// The date is the calendar date the user picked, so no timezone shift applies.
pub fn build_report_run_request(
    date: Option<NaiveDate>,
    options: RunOptions,
) -> Result<ReportRunRequest> {
    let date = date.ok_or(IftaError::MissingDate)?;
    Ok(ReportRunRequest { date, options })
}

/// `YYYY-MM-DD` path segment for `api/entries/{date}/`
pub fn date_query_key(query: &DateQuery) -> String {
    format!("{:04}-{:02}-{:02}", query.year(), query.month(), query.day())
}

/// Body of `POST api/bills/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BillingQuery {
    pub month: u32,
    pub year: i32,
}

pub fn build_billing_query(month: u32, year: i32) -> Result<BillingQuery> {
    if !(1..=12).contains(&month) {
        return Err(IftaError::InvalidMonth(month));
    }
    crate::dates::check_year(year)?;
    Ok(BillingQuery { month, year })
}

impl BillingQuery {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
