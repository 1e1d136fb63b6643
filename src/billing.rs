use serde::Deserialize;
use serde_json::Value;

use crate::error::{IftaError, Result};

/// Header plus four data rows
pub const PREVIEW_LINES: usize = 5;

/// Monthly billing summary for one company
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BillingRecord {
    pub company_name: String,
    pub total_cost: f64,
    #[serde(default)]
    pub orders_csv: String,
    #[serde(default)]
    pub contracts_csv: String,
}

impl BillingRecord {
    pub fn has_orders(&self) -> bool {
        !self.orders_csv.trim().is_empty()
    }

    pub fn has_contracts(&self) -> bool {
        !self.contracts_csv.trim().is_empty()
    }
}

/// Decode the `api/bills/` response, keeping the server's key order.
pub fn parse_billing_response(body: &str) -> Result<Vec<(String, BillingRecord)>> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Object(map) = value else {
        return Err(IftaError::MalformedResponse(
            "expected billing records keyed by id".to_string(),
        ));
    };

    map.into_iter()
        .map(|(key, record)| {
            let record = serde_json::from_value(record).map_err(|e| {
                IftaError::MalformedResponse(format!("billing record '{key}': {e}"))
            })?;
            Ok((key, record))
        })
        .collect()
}

/// First few lines of a CSV for inline display.
pub fn preview_csv(text: &str) -> String {
    text.lines().take(PREVIEW_LINES).collect::<Vec<_>>().join("\n")
}
