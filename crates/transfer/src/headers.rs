use crate::error::TransferError;
use crate::request::RequestDetails;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use reqwest::header::CONNECTION;
use reqwest::header::USER_AGENT;
use std::sync::OnceLock;

const UBER_TRACE_ID_HEADER: &str = "uber-trace-id";

const DEFAULT_USER_AGENT: &str = concat!("artifact-transfer/", env!("CARGO_PKG_VERSION"));

static USER_AGENT_STRING: OnceLock<String> = OnceLock::new();
static UBER_TRACE_ID_TOKEN: OnceLock<String> = OnceLock::new();

/// Overrides the `User-Agent` attached to every request. Write-once; later
/// calls are ignored.
pub fn set_user_agent(agent: &str) {
    let _ = USER_AGENT_STRING.set(agent.into());
}

pub fn user_agent() -> &'static str {
    USER_AGENT_STRING
        .get()
        .map(String::as_str)
        .unwrap_or(DEFAULT_USER_AGENT)
}

/// Attaches the `uber-trace-id` header to every subsequent request sent by
/// every client in this process, allowing server-side logs to be correlated
/// with this client. Write-once; later calls are ignored.
///
/// Header format: `{trace-id}:{span-id}:{parent-span-id}:{flags}`, with the
/// trace id and span id set to the same token and the rest zeroed.
pub fn set_trace_id_token(token: &str) {
    let _ = UBER_TRACE_ID_TOKEN.set(format_trace_token(token));
}

fn format_trace_token(token: &str) -> String {
    format!("{token}:{token}:0:0")
}

pub(crate) fn trace_id_token() -> Option<&'static str> {
    UBER_TRACE_ID_TOKEN.get().map(String::as_str)
}

/// Composes the headers for one attempt: connection close, user agent, the
/// trace id when set, then the caller's headers. Caller headers use replace
/// semantics, so an explicit caller value wins over user agent and trace id.
pub(crate) fn compose_headers(details: &RequestDetails) -> Result<HeaderMap, TransferError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONNECTION, HeaderValue::from_static("close"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent()).map_err(|_| TransferError::InvalidHeader {
            name: USER_AGENT.to_string(),
        })?,
    );
    if let Some(token) = trace_id_token() {
        headers.insert(
            HeaderName::from_static(UBER_TRACE_ID_HEADER),
            HeaderValue::from_str(token).map_err(|_| TransferError::InvalidHeader {
                name: UBER_TRACE_ID_HEADER.into(),
            })?,
        );
    }
    for (name, value) in &details.headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| TransferError::InvalidHeader {
                name: name.clone(),
            })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| TransferError::InvalidHeader {
                name: name.clone(),
            })?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}
