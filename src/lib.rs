pub mod billing;
pub mod client;
pub mod config;
pub mod dates;
pub mod error;
pub mod export;
pub mod request;
pub mod table;
pub mod workflow;

pub use billing::{preview_csv, BillingRecord};
pub use client::{ApiClient, HttpTransport, RunReport, Session, Transport};
pub use config::Config;
pub use dates::{days_in_month, is_date_selectable, DateQuery};
pub use error::{IftaError, Result};
pub use request::{build_report_run_request, BillingQuery, ReportRunRequest, RunOptions};
pub use table::{parse_csv, serialize_rows_to_csv, ReportTable, TabularRow};
pub use workflow::{FormState, Outcome};
