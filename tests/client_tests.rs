use std::cell::RefCell;

use chrono::NaiveDate;
use trivifta::client::{ApiClient, RunReport, Session, Transport, CSRF_HEADER};
use trivifta::request::{build_billing_query, build_report_run_request, RunOptions};
use trivifta::table::{parse_csv, serialize_rows_to_csv, ReportTable, TabularRow, ID_COLUMN};
use trivifta::{DateQuery, FormState, IftaError, Outcome};

#[derive(Debug, Clone, PartialEq)]
struct Recorded {
    method: &'static str,
    url: String,
    body: Option<String>,
    headers: Vec<(String, String)>,
}

/// Answers every request with a canned body and remembers what was asked.
struct FakeTransport {
    response: std::result::Result<String, u16>,
    calls: RefCell<Vec<Recorded>>,
}

impl FakeTransport {
    fn replying(body: &str) -> Self {
        Self {
            response: Ok(body.to_string()),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn failing(status: u16) -> Self {
        Self {
            response: Err(status),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn reply(&self, url: &str) -> trivifta::Result<String> {
        self.response.clone().map_err(|status| IftaError::HttpStatus {
            url: url.to_string(),
            status,
        })
    }
}

impl Transport for &FakeTransport {
    fn get(&self, url: &str) -> trivifta::Result<String> {
        self.calls.borrow_mut().push(Recorded {
            method: "GET",
            url: url.to_string(),
            body: None,
            headers: Vec::new(),
        });
        self.reply(url)
    }

    fn post_json(
        &self,
        url: &str,
        body: &str,
        headers: &[(&str, &str)],
    ) -> trivifta::Result<String> {
        self.calls.borrow_mut().push(Recorded {
            method: "POST",
            url: url.to_string(),
            body: Some(body.to_string()),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        self.reply(url)
    }
}

fn client(transport: &FakeTransport, session: Session) -> ApiClient<&FakeTransport> {
    ApiClient::new(transport, "http://backend.test/", session)
}

fn row(pairs: &[(&str, &str)]) -> TabularRow {
    pairs.iter().copied().collect()
}

#[test]
fn envelope_becomes_table() {
    let report = RunReport::from_envelope(r#"{"text":"a,b\n1,2\n3,4"}"#).unwrap();

    assert_eq!(report.table.headers(), ["a", "b"]);
    assert_eq!(
        report.table.rows(),
        [row(&[("a", "1"), ("b", "2")]), row(&[("a", "3"), ("b", "4")])]
    );
    assert_eq!(report.csv_text, "a,b\n1,2\n3,4");
}

#[test]
fn double_encoded_envelope_is_accepted() {
    let body = serde_json::to_string(r#"{"text":"a,b\n1,2"}"#).unwrap();
    let report = RunReport::from_envelope(&body).unwrap();
    assert_eq!(report.table.len(), 1);
}

#[test]
fn run_report_posts_options_with_token() {
    let body = serde_json::to_string(r#"{"text":"unit,miles\nT1,10"}"#).unwrap();
    let transport = FakeTransport::replying(&body);
    let api = client(&transport, Session::with_token("tok"));

    let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
    let request = build_report_run_request(
        Some(date),
        RunOptions {
            send_to_ftp: true,
            ..RunOptions::default()
        },
    )
    .unwrap();
    let report = api.run_report(&request).unwrap();
    assert_eq!(report.table.rows()[0].get("miles"), Some("10"));

    let calls = transport.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "POST");
    assert_eq!(calls[0].url, "http://backend.test/api/run-job/");
    assert_eq!(
        calls[0].headers,
        vec![(CSRF_HEADER.to_string(), "tok".to_string())]
    );
    let sent: serde_json::Value = serde_json::from_str(calls[0].body.as_deref().unwrap()).unwrap();
    assert_eq!(
        sent,
        serde_json::json!({
            "date": "2024-05-02",
            "remove_unchanged": false,
            "send_email": false,
            "save_to_db": true,
            "send_to_ftp": true
        })
    );
}

#[test]
fn missing_date_never_reaches_transport() {
    let transport = FakeTransport::replying("{}");
    let _api = client(&transport, Session::default());

    let result = build_report_run_request(None, RunOptions::default());
    assert!(matches!(result, Err(IftaError::MissingDate)));
    assert!(transport.calls.borrow().is_empty());
}

#[test]
fn empty_csv_text_is_malformed() {
    let transport = FakeTransport::replying(r#"{"text": ""}"#);
    let api = client(&transport, Session::default());
    let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
    let request = build_report_run_request(Some(date), RunOptions::default()).unwrap();

    let err = api.run_report(&request).unwrap_err();
    assert!(matches!(err, IftaError::MalformedResponse(_)));
    assert!(err.is_remote());
}

#[test]
fn entries_use_date_path_and_keep_column_order() {
    let transport = FakeTransport::replying(
        r#"[{"id": 7, "vehicle": "T-1", "miles": 12.5, "state": null},
            {"id": 8, "vehicle": "T-2", "miles": 3, "state": "IA"}]"#,
    );
    let api = client(&transport, Session::default());
    let query = DateQuery::new(2024, 3, 9).unwrap();

    let rows = api.fetch_entries_for_date(&query).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0].keys().collect::<Vec<_>>(),
        ["id", "vehicle", "miles", "state"]
    );
    assert_eq!(rows[0].get("state"), Some(""));

    let calls = transport.calls.borrow();
    assert_eq!(calls[0].method, "GET");
    assert_eq!(calls[0].url, "http://backend.test/api/entries/2024-03-09/");
}

#[test]
fn id_column_is_dropped_from_view_and_export() {
    let rows = vec![
        row(&[("id", "1"), ("vehicle", "T-1"), ("miles", "5")]),
        row(&[("id", "2"), ("vehicle", "T-2"), ("miles", "6")]),
    ];
    let table = ReportTable::from_rows(rows).without_column(ID_COLUMN);

    assert_eq!(table.headers(), ["vehicle", "miles"]);
    let csv = table.to_csv().unwrap();
    assert_eq!(csv, "vehicle,miles\nT-1,5\nT-2,6");
    assert!(!csv.contains("id"));
}

#[test]
fn empty_entries_are_not_an_error() {
    let transport = FakeTransport::replying("[]");
    let api = client(&transport, Session::default());
    let query = DateQuery::new(2023, 1, 1).unwrap();

    let rows = api.fetch_entries_for_date(&query).unwrap();
    assert!(rows.is_empty());
    assert!(ReportTable::from_rows(rows).is_empty());
}

#[test]
fn billing_posts_numeric_month_and_year() {
    let transport = FakeTransport::replying(
        r#"{"42": {"company_name": "Acme Freight", "total_cost": 1250.75,
                   "orders_csv": "order,cost\n1,10", "contracts_csv": ""}}"#,
    );
    let api = client(&transport, Session::from_cookie_header("csrftoken=abc"));
    let query = build_billing_query(2, 2024).unwrap();

    let records = api.fetch_billing(&query).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, "42");
    assert_eq!(records[0].1.company_name, "Acme Freight");
    assert!(records[0].1.has_orders());

    let calls = transport.calls.borrow();
    assert_eq!(calls[0].url, "http://backend.test/api/bills/");
    assert_eq!(calls[0].body.as_deref(), Some(r#"{"month":2,"year":2024}"#));
    assert_eq!(calls[0].headers[0].1, "abc");
}

#[test]
fn http_failure_surfaces_through_form() {
    let transport = FakeTransport::failing(500);
    let api = client(&transport, Session::default());
    let query = DateQuery::new(2024, 3, 9).unwrap();

    let mut form = FormState::new("query-database");
    let submission = form.begin();
    assert!(form.is_loading());

    let outcome = form.finish(submission, api.fetch_entries_for_date(&query));
    assert!(matches!(
        outcome,
        Outcome::Failed(IftaError::HttpStatus { status: 500, .. })
    ));
    assert!(!form.is_loading());
    assert!(form.data().is_none());
}

#[test]
fn server_config_and_companies() {
    let transport = FakeTransport::replying(r#"{"API_BASE_URL": "http://prod.test"}"#);
    let api = client(&transport, Session::default());
    assert_eq!(api.fetch_server_config().unwrap().api_base_url, "http://prod.test");

    let transport = FakeTransport::replying(r#"{"companies": ["Acme", "Beta"]}"#);
    let api = client(&transport, Session::default());
    assert_eq!(api.fetch_companies().unwrap(), ["Acme", "Beta"]);
    assert_eq!(
        transport.calls.borrow()[0].url,
        "http://backend.test/billing/companies/"
    );
}

#[test]
fn plain_rows_survive_serialize_then_parse() {
    let rows = vec![
        row(&[("unit", "T-1"), ("jurisdiction", "IA"), ("miles", "120.5")]),
        row(&[("unit", "T-2"), ("jurisdiction", "NE"), ("miles", "")]),
        row(&[("unit", "T-3"), ("jurisdiction", "MN"), ("miles", "7")]),
    ];
    let text = serialize_rows_to_csv(&rows).unwrap();
    let parsed = parse_csv(&text).unwrap();

    assert_eq!(parsed.headers(), ["unit", "jurisdiction", "miles"]);
    assert_eq!(parsed.rows(), rows.as_slice());
}

#[test]
fn quoted_values_round_trip() {
    let rows = vec![row(&[("name", "Smith, J"), ("note", "said \"hi\"")])];
    let parsed = parse_csv(&serialize_rows_to_csv(&rows).unwrap()).unwrap();
    assert_eq!(parsed.into_rows(), rows);
}
