pub mod types;

pub use types::{Change, ChangeRecord};

use diqwest::WithDigestAuth;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::Credentials;

/// Detail options requested with every change query. CURRENT_COMMIT appears
/// twice; the server accepts the duplicate.
const GERRIT_OPTS: [&str; 5] = [
    "CURRENT_REVISION",
    "CURRENT_COMMIT",
    "CURRENT_COMMIT",
    "CURRENT_FILES",
    "DETAILED_ACCOUNTS",
];

/// Length of the `)]}'` anti-XSSI guard Gerrit prepends to JSON bodies.
/// The newline after it is left for the JSON parser to skip as whitespace.
const XSSI_PREFIX_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum GerritError {
    #[error("Gerrit API request failed: {0}")]
    ApiRequest(#[from] diqwest::error::Error),

    #[error("Failed to read Gerrit response: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed Gerrit response: {0}")]
    MalformedResponse(String),

    #[error("Malformed change record {number}: {reason}")]
    MalformedChange { number: u64, reason: String },
}

/// Run one change search against `https://<host>/a/changes/`.
///
/// Returns the matching records in server order. A non-200 response degrades
/// to an empty list after dumping the status and body to stdout, so a bad
/// query or an expired password turns the run into a no-op rather than an
/// error; a 200 whose body is not guarded JSON is an error.
#[instrument(skip_all, fields(host = %host, query = %query))]
pub async fn fetch_changes(
    credentials: &Credentials,
    host: &str,
    query: &str,
    limit: u32,
) -> Result<Vec<ChangeRecord>, GerritError> {
    println!("Running: {query}");

    let url = format!("https://{host}/a/changes/");
    let params = build_query_params(query, limit);

    debug!(url = %url, params = params.len(), "sending change query");
    let client = reqwest::Client::new();
    let response = client
        .get(&url)
        .query(&params)
        .send_with_digest_auth(&credentials.user, &credentials.password)
        .await?;

    let status = response.status();
    let summary = format!("<Response [{status}]>");
    let body = response.text().await?;
    debug!(status = %status, bytes = body.len(), "received change query response");

    parse_query_response(status, &summary, &body)
}

/// Query parameters for one change search. `limit` is forwarded only when
/// nonzero; zero means the server default applies.
fn build_query_params(query: &str, limit: u32) -> Vec<(&'static str, String)> {
    let mut params: Vec<(&'static str, String)> = vec![("q", query.to_string())];
    params.extend(GERRIT_OPTS.iter().map(|opt| ("o", (*opt).to_string())));
    if limit > 0 {
        params.push(("limit", limit.to_string()));
    }
    params
}

/// Split on status: a 200 body is decoded, anything else is dumped to stdout
/// and treated as zero results.
fn parse_query_response(
    status: StatusCode,
    summary: &str,
    body: &str,
) -> Result<Vec<ChangeRecord>, GerritError> {
    if status == StatusCode::OK {
        decode_body(body)
    } else {
        println!("Status : Failed");
        println!("       : {summary}");
        println!("       : {body}");
        Ok(Vec::new())
    }
}

/// Strip the 4-byte anti-XSSI guard and parse the JSON array behind it.
fn decode_body(body: &str) -> Result<Vec<ChangeRecord>, GerritError> {
    let json = body.get(XSSI_PREFIX_LEN..).ok_or_else(|| {
        GerritError::MalformedResponse(
            "response body shorter than the anti-XSSI guard".to_string(),
        )
    })?;

    serde_json::from_str(json).map_err(|e| GerritError::MalformedResponse(e.to_string()))
}
