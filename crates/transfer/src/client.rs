use crate::auth::apply_authentication;
use crate::error::TransferError;
use crate::extract::ArchiveExtractor;
use crate::headers::compose_headers;
use crate::request::RequestDetails;
use crate::retry::Attempt;
use crate::retry::RetryExecutor;
use camino::Utf8Path;
use log::debug;
use log::warn;
use reqwest::header::HeaderMap;
use reqwest::header::ACCEPT_RANGES;
use reqwest::header::CONTENT_LENGTH;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::Method;
use reqwest::StatusCode;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// An HTTP client for artifact transfers.
///
/// Holds the shared transport, the retry policy applied to every exchange,
/// and an optional cancellation token propagated into every request.
/// Immutable after construction and cheap to clone; clones share the
/// underlying connection pools.
#[derive(Clone)]
pub struct TransferClient {
    pub(crate) client: reqwest::Client,
    pub(crate) no_redirect_client: reqwest::Client,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) retries: u32,
    pub(crate) retry_wait: Duration,
    pub(crate) extractor: Option<Arc<dyn ArchiveExtractor>>,
}

pub struct TransferClientBuilder {
    retries: u32,
    retry_wait: Duration,
    timeout: Option<Duration>,
    cancellation: Option<CancellationToken>,
    extractor: Option<Arc<dyn ArchiveExtractor>>,
}

impl Default for TransferClientBuilder {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_wait: Duration::ZERO,
            timeout: None,
            cancellation: None,
            extractor: None,
        }
    }
}

impl TransferClientBuilder {
    pub fn with_retries(self, retries: u32) -> Self {
        Self { retries, ..self }
    }

    pub fn with_retry_wait_ms(self, retry_wait_ms: u64) -> Self {
        Self {
            retry_wait: Duration::from_millis(retry_wait_ms),
            ..self
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..self
        }
    }

    pub fn with_cancellation(self, cancellation: CancellationToken) -> Self {
        Self {
            cancellation: Some(cancellation),
            ..self
        }
    }

    pub fn with_extractor(self, extractor: Arc<dyn ArchiveExtractor>) -> Self {
        Self {
            extractor: Some(extractor),
            ..self
        }
    }

    pub fn build(self) -> Result<TransferClient, TransferError> {
        Ok(TransferClient {
            client: http_client(self.timeout, Policy::default())?,
            no_redirect_client: http_client(self.timeout, Policy::none())?,
            cancellation: self.cancellation,
            retries: self.retries,
            retry_wait: self.retry_wait,
            extractor: self.extractor,
        })
    }
}

fn http_client(timeout: Option<Duration>, policy: Policy) -> Result<reqwest::Client, TransferError> {
    let mut builder = reqwest::Client::builder().redirect(policy);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Status and headers of a response whose body has already been consumed.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl ResponseMeta {
    pub(crate) fn from_response(response: &reqwest::Response) -> Self {
        Self {
            status: response.status(),
            headers: response.headers().clone(),
        }
    }

    pub fn status_line(&self) -> String {
        self.status.to_string()
    }
}

/// Result of a buffered exchange.
///
/// When a redirect was blocked, `redirect_url` carries the target, the meta
/// is the 3xx response, and the body is empty.
#[derive(Debug)]
pub struct SendOutcome {
    pub meta: ResponseMeta,
    pub body: Vec<u8>,
    pub redirect_url: Option<String>,
}

/// Details of a remote file as reported by a HEAD request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteFileDetails {
    pub size: i64,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub sha256: Option<String>,
}

pub(crate) struct DispatchOutcome {
    pub(crate) response: reqwest::Response,
    pub(crate) redirect_url: Option<String>,
}

impl TransferClient {
    pub fn builder() -> TransferClientBuilder {
        TransferClientBuilder::default()
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn retry_wait(&self) -> Duration {
        self.retry_wait
    }

    /// Performs a buffered exchange: the response body is fully read before
    /// returning. Attempts are driven by the retry policy; a response is
    /// retried when its status is 5xx or 429 and every pre-retry interceptor
    /// agrees.
    ///
    /// Redirects are followed by the transport except for POST, which the
    /// transport never follows automatically: a redirected POST with
    /// `follow_redirect` set is re-issued once against the captured target.
    /// With `follow_redirect` unset the captured target is returned instead.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        content: Option<&[u8]>,
        follow_redirect: bool,
        details: &RequestDetails,
        log_msg_prefix: &str,
    ) -> Result<SendOutcome, TransferError> {
        let executor = self.retry_executor(
            log_msg_prefix,
            format!("Failure occurred while sending {method} request to {url}"),
        );
        let handler = || {
            let method = method.clone();
            async move {
                let outcome = match self
                    .dispatch(method.clone(), url, content, follow_redirect, details)
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(err) => return Attempt::from_error(err),
                };

                if let Some(redirect_url) = outcome.redirect_url {
                    if follow_redirect && method == Method::POST {
                        // The transport never redirects POST on its own, so
                        // the captured target is re-dispatched manually.
                        debug!("{log_msg_prefix}HTTP redirecting to {redirect_url}");
                        return match self
                            .send_boxed(
                                Method::POST,
                                redirect_url,
                                content.map(|content| content.to_vec()),
                                true,
                                details,
                                "",
                            )
                            .await
                        {
                            Ok(outcome) => Attempt::Complete(outcome),
                            Err(err) => Attempt::Fatal(err),
                        };
                    }
                    debug!("{log_msg_prefix}Blocking HTTP redirect to {redirect_url}");
                    return Attempt::Complete(SendOutcome {
                        meta: ResponseMeta::from_response(&outcome.response),
                        body: Vec::new(),
                        redirect_url: Some(redirect_url),
                    });
                }

                let meta = ResponseMeta::from_response(&outcome.response);
                let body = match outcome.response.bytes().await {
                    Ok(bytes) => bytes.to_vec(),
                    Err(err) => return Attempt::Retry(Some(err.into())),
                };
                if self.should_retry(&meta, details) {
                    warn!(
                        "{}The server response: {}\n{}",
                        log_msg_prefix,
                        meta.status_line(),
                        indent_json(&body)
                    );
                    return Attempt::Retry(None);
                }
                Attempt::Complete(SendOutcome {
                    meta,
                    body,
                    redirect_url: None,
                })
            }
        };
        executor.execute(handler).await
    }

    fn send_boxed<'a>(
        &'a self,
        method: Method,
        url: String,
        content: Option<Vec<u8>>,
        follow_redirect: bool,
        details: &'a RequestDetails,
        log_msg_prefix: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<SendOutcome, TransferError>> + Send + 'a>> {
        Box::pin(async move {
            self.send(
                method,
                &url,
                content.as_deref(),
                follow_redirect,
                details,
                log_msg_prefix,
            )
            .await
        })
    }

    pub async fn send_get(
        &self,
        url: &str,
        follow_redirect: bool,
        details: &RequestDetails,
        log_msg_prefix: &str,
    ) -> Result<SendOutcome, TransferError> {
        self.send(Method::GET, url, None, follow_redirect, details, log_msg_prefix)
            .await
    }

    pub async fn send_post(
        &self,
        url: &str,
        content: &[u8],
        details: &RequestDetails,
        log_msg_prefix: &str,
    ) -> Result<SendOutcome, TransferError> {
        self.send(Method::POST, url, Some(content), true, details, log_msg_prefix)
            .await
    }

    pub async fn send_patch(
        &self,
        url: &str,
        content: &[u8],
        details: &RequestDetails,
        log_msg_prefix: &str,
    ) -> Result<SendOutcome, TransferError> {
        self.send(Method::PATCH, url, Some(content), true, details, log_msg_prefix)
            .await
    }

    pub async fn send_delete(
        &self,
        url: &str,
        content: Option<&[u8]>,
        details: &RequestDetails,
        log_msg_prefix: &str,
    ) -> Result<SendOutcome, TransferError> {
        self.send(Method::DELETE, url, content, true, details, log_msg_prefix)
            .await
    }

    pub async fn send_head(
        &self,
        url: &str,
        details: &RequestDetails,
        log_msg_prefix: &str,
    ) -> Result<SendOutcome, TransferError> {
        self.send(Method::HEAD, url, None, true, details, log_msg_prefix)
            .await
    }

    pub async fn send_put(
        &self,
        url: &str,
        content: &[u8],
        details: &RequestDetails,
        log_msg_prefix: &str,
    ) -> Result<SendOutcome, TransferError> {
        self.send(Method::PUT, url, Some(content), true, details, log_msg_prefix)
            .await
    }

    /// GET leaving the response body open, with the same retry policy as
    /// [`TransferClient::send`]. The caller consumes and thereby closes the
    /// returned body.
    pub async fn stream(
        &self,
        url: &str,
        details: &RequestDetails,
        log_msg_prefix: &str,
    ) -> Result<(reqwest::Response, Option<String>), TransferError> {
        let executor = self.retry_executor(
            log_msg_prefix,
            format!("Failure occurred while sending GET request to {url}"),
        );
        executor
            .execute(|| async move {
                let outcome = match self.dispatch(Method::GET, url, None, true, details).await {
                    Ok(outcome) => outcome,
                    Err(err) => return Attempt::from_error(err),
                };
                let meta = ResponseMeta::from_response(&outcome.response);
                if self.should_retry(&meta, details) {
                    warn!(
                        "{}The server response: {}",
                        log_msg_prefix,
                        meta.status_line()
                    );
                    return Attempt::Retry(None);
                }
                Attempt::Complete((outcome.response, outcome.redirect_url))
            })
            .await
    }

    /// Reads a remote file as an open stream. The caller is responsible for
    /// checking that the status is 200 before reading the body.
    pub async fn read_remote_file(
        &self,
        url: &str,
        details: &RequestDetails,
    ) -> Result<reqwest::Response, TransferError> {
        let (response, _) = self.stream(url, details, "").await?;
        Ok(response)
    }

    /// HEAD probe for the size and server-side checksums of a remote file.
    pub async fn remote_file_details(
        &self,
        url: &str,
        details: &RequestDetails,
    ) -> Result<(RemoteFileDetails, ResponseMeta), TransferError> {
        let outcome = self.send_head(url, details, "").await?;
        if outcome.meta.status != StatusCode::OK {
            return Err(TransferError::UnexpectedStatus {
                status: outcome.meta.status_line(),
                body: String::from_utf8_lossy(&outcome.body).into_owned(),
            });
        }
        debug!("Server response: {}", outcome.meta.status_line());

        let size = match outcome.meta.headers.get(CONTENT_LENGTH) {
            Some(value) => value
                .to_str()
                .ok()
                .and_then(|value| value.parse::<i64>().ok())
                .ok_or_else(|| TransferError::InvalidHeader {
                    name: CONTENT_LENGTH.to_string(),
                })?,
            None => 0,
        };
        let remote = RemoteFileDetails {
            size,
            md5: checksum_header(&outcome.meta.headers, "X-Checksum-Md5"),
            sha1: checksum_header(&outcome.meta.headers, "X-Checksum-Sha1"),
            sha256: checksum_header(&outcome.meta.headers, "X-Checksum-Sha256"),
        };
        Ok((remote, outcome.meta))
    }

    /// HEAD probe for byte-range support. The caller is responsible for
    /// checking that the status is 200 before relying on the flag.
    pub async fn is_accept_ranges(
        &self,
        url: &str,
        details: &RequestDetails,
    ) -> Result<(bool, ResponseMeta), TransferError> {
        let outcome = self.send_head(url, details, "").await?;
        if outcome.meta.status != StatusCode::OK {
            return Ok((false, outcome.meta));
        }
        let accept_ranges = outcome
            .meta
            .headers
            .get(ACCEPT_RANGES)
            .and_then(|value| value.to_str().ok())
            == Some("bytes");
        Ok((accept_ranges, outcome.meta))
    }

    /// One dispatch through the transport: auth, headers, redirect policy,
    /// cancellation. The body is left open.
    pub(crate) async fn dispatch(
        &self,
        method: Method,
        url: &str,
        content: Option<&[u8]>,
        follow_redirect: bool,
        details: &RequestDetails,
    ) -> Result<DispatchOutcome, TransferError> {
        validate_url(url)?;
        debug!("Sending HTTP {method} request to: {url}");

        // The transport only follows redirects on its own for non-POST
        // methods; every other combination needs the capturing client.
        let capture_redirect = !follow_redirect || method == Method::POST;
        let client = if capture_redirect {
            &self.no_redirect_client
        } else {
            &self.client
        };

        let mut builder = client.request(method, url);
        builder = apply_authentication(builder, &details.credentials);
        builder = builder.headers(compose_headers(details)?);
        if let Some(content) = content {
            builder = builder.body(content.to_vec());
        }

        let response = self.await_cancellable(builder.send()).await?;
        let redirect_url = if capture_redirect && response.status().is_redirection() {
            resolve_location(&response)
        } else {
            None
        };
        Ok(DispatchOutcome {
            response,
            redirect_url,
        })
    }

    pub(crate) async fn await_cancellable<T>(
        &self,
        fut: impl Future<Output = Result<T, reqwest::Error>>,
    ) -> Result<T, TransferError> {
        match &self.cancellation {
            Some(token) => tokio::select! {
                _ = token.cancelled() => Err(TransferError::Cancelled),
                result = fut => result.map_err(TransferError::from),
            },
            None => fut.await.map_err(TransferError::from),
        }
    }

    fn should_retry(&self, meta: &ResponseMeta, details: &RequestDetails) -> bool {
        if meta.status.as_u16() < 500 && meta.status != StatusCode::TOO_MANY_REQUESTS {
            return false;
        }
        details
            .pre_retry_interceptors
            .iter()
            .all(|should_retry| should_retry())
    }

    pub(crate) fn retry_executor(
        &self,
        log_msg_prefix: &str,
        error_message: String,
    ) -> RetryExecutor {
        RetryExecutor {
            max_retries: self.retries,
            retry_interval: self.retry_wait,
            log_msg_prefix: log_msg_prefix.into(),
            error_message,
            cancellation: self.cancellation.clone(),
        }
    }

    pub(crate) fn extract_archive(
        &self,
        local_path: &str,
        local_file_name: &str,
        file_name: &str,
        log_msg_prefix: &str,
        bypass_inspection: bool,
    ) -> Result<(), TransferError> {
        match &self.extractor {
            Some(extractor) => extractor
                .extract(
                    Utf8Path::new(local_path),
                    local_file_name,
                    file_name,
                    log_msg_prefix,
                    bypass_inspection,
                )
                .map_err(TransferError::Extract),
            None => {
                debug!("{log_msg_prefix}No archive extractor configured, leaving {local_file_name} as is");
                Ok(())
            }
        }
    }
}

pub(crate) fn validate_url(url: &str) -> Result<(), TransferError> {
    let parsed = url::Url::parse(url).map_err(|err| TransferError::InvalidUrl {
        url: url.into(),
        reason: err.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(TransferError::InvalidUrl {
            url: url.into(),
            reason: format!("unsupported protocol scheme {scheme:?}"),
        }),
    }
}

fn resolve_location(response: &reqwest::Response) -> Option<String> {
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    match response.url().join(location) {
        Ok(url) => Some(url.to_string()),
        Err(_) => Some(location.into()),
    }
}

fn checksum_header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Pretty-prints a response body for retry warnings when it is JSON, and
/// falls back to the raw text otherwise.
pub(crate) fn indent_json(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        if let Ok(pretty) = serde_json::to_string_pretty(&value) {
            return pretty;
        }
    }
    String::from_utf8_lossy(body).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::set_trace_id_token;
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;
    use tokio::io::AsyncBufReadExt;
    use tokio::io::AsyncWriteExt;
    use tokio::io::BufReader;
    use tokio::net::TcpListener;

    const RESP_503: &str = "HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";
    const RESP_200_HELLO: &str =
        "HTTP/1.1 200 OK\r\ncontent-length: 12\r\nconnection: close\r\n\r\nhello world\n";

    /// Minimal HTTP server answering one scripted response per connection;
    /// the last response repeats once the script runs out.
    async fn spawn_scripted_server(
        responses: Vec<&'static str>,
    ) -> (u16, std::sync::Arc<AtomicU32>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let hits = std::sync::Arc::new(AtomicU32::new(0));
        let hits_clone = hits.clone();
        tokio::spawn(async move {
            let mut responses = responses.into_iter().peekable();
            while let Ok((mut stream, _addr)) = listener.accept().await {
                let response = if responses.len() > 1 {
                    responses.next().unwrap()
                } else {
                    *responses.peek().unwrap()
                };
                hits_clone.fetch_add(1, Ordering::SeqCst);
                let (reader, mut writer) = stream.split();
                let mut lines = BufReader::new(reader).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if line.is_empty() {
                        break;
                    }
                }
                writer.write_all(response.as_bytes()).await.unwrap();
                writer.shutdown().await.ok();
            }
        });
        (port, hits)
    }

    fn client() -> TransferClient {
        TransferClient::builder()
            .with_retries(3)
            .with_retry_wait_ms(10)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn get_returns_the_buffered_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/artifact")
            .with_status(200)
            .with_body(b"content")
            .create_async()
            .await;

        let outcome = client()
            .send_get(
                &format!("{}/artifact", server.url()),
                true,
                &RequestDetails::new(),
                "",
            )
            .await
            .unwrap();

        assert_eq!(outcome.meta.status, StatusCode::OK);
        assert_eq!(outcome.body, b"content");
        assert!(outcome.redirect_url.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn retries_on_server_errors_until_success() {
        let (port, hits) = spawn_scripted_server(vec![RESP_503, RESP_503, RESP_200_HELLO]).await;

        let outcome = client()
            .send_get(
                &format!("http://127.0.0.1:{port}/artifact"),
                true,
                &RequestDetails::new(),
                "",
            )
            .await
            .unwrap();

        assert_eq!(outcome.meta.status, StatusCode::OK);
        assert_eq!(outcome.body, b"hello world\n");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_report_the_configured_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/artifact")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        let client = TransferClient::builder()
            .with_retries(1)
            .with_retry_wait_ms(1)
            .build()
            .unwrap();
        let err = client
            .send_get(
                &format!("{}/artifact", server.url()),
                true,
                &RequestDetails::new(),
                "",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::RetriesExhausted { .. }));
        assert!(err.to_string().contains("Failure occurred while sending"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn pre_retry_interceptor_vetoes_the_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/artifact")
            .with_status(429)
            .expect(1)
            .create_async()
            .await;

        let details = RequestDetails::new().with_pre_retry_interceptor(|| false);
        let outcome = client()
            .send_get(&format!("{}/artifact", server.url()), true, &details, "")
            .await
            .unwrap();

        assert_eq!(outcome.meta.status, StatusCode::TOO_MANY_REQUESTS);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn post_is_reissued_to_the_redirect_target() {
        let mut server = mockito::Server::new_async().await;
        let _redirect = server
            .mock("POST", "/old")
            .with_status(302)
            .with_header("location", &format!("{}/new", server.url()))
            .create_async()
            .await;
        let target = server
            .mock("POST", "/new")
            .match_body("payload")
            .with_status(200)
            .with_body(b"landed")
            .create_async()
            .await;

        let outcome = client()
            .send_post(
                &format!("{}/old", server.url()),
                b"payload",
                &RequestDetails::new(),
                "",
            )
            .await
            .unwrap();

        assert_eq!(outcome.meta.status, StatusCode::OK);
        assert_eq!(outcome.body, b"landed");
        assert!(outcome.redirect_url.is_none());
        target.assert_async().await;
    }

    #[tokio::test]
    async fn blocked_redirect_surfaces_the_target() {
        let mut server = mockito::Server::new_async().await;
        let _redirect = server
            .mock("POST", "/old")
            .with_status(302)
            .with_header("location", &format!("{}/new", server.url()))
            .create_async()
            .await;

        let outcome = client()
            .send(
                Method::POST,
                &format!("{}/old", server.url()),
                Some(b"payload"),
                false,
                &RequestDetails::new(),
                "",
            )
            .await
            .unwrap();

        assert_eq!(outcome.meta.status, StatusCode::FOUND);
        assert!(outcome.body.is_empty());
        assert_eq!(outcome.redirect_url, Some(format!("{}/new", server.url())));
    }

    #[tokio::test]
    async fn missing_scheme_is_rejected_with_a_hint() {
        let err = client()
            .send_get("localhost/artifact", true, &RequestDetails::new(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::InvalidUrl { .. }));
        assert!(err.to_string().contains("http://"));
    }

    #[tokio::test]
    async fn unsupported_scheme_is_rejected_with_a_hint() {
        let err = client()
            .send_get("ftp://localhost/artifact", true, &RequestDetails::new(), "")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unsupported protocol scheme"));
    }

    #[tokio::test]
    async fn trace_id_is_attached_to_every_request() {
        set_trace_id_token("trace-token-1");

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/artifact")
            .match_header("uber-trace-id", "trace-token-1:trace-token-1:0:0")
            .with_status(200)
            .create_async()
            .await;

        client()
            .send_get(
                &format!("{}/artifact", server.url()),
                true,
                &RequestDetails::new(),
                "",
            )
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn head_reports_size_and_checksums() {
        let (port, _) = spawn_scripted_server(vec![
            "HTTP/1.1 200 OK\r\ncontent-length: 1024\r\naccept-ranges: bytes\r\nx-checksum-md5: m\r\nx-checksum-sha1: s1\r\nx-checksum-sha256: s2\r\nconnection: close\r\n\r\n",
        ])
        .await;
        let url = format!("http://127.0.0.1:{port}/artifact");

        let (remote, meta) = client()
            .remote_file_details(&url, &RequestDetails::new())
            .await
            .unwrap();
        assert_eq!(meta.status, StatusCode::OK);
        assert_eq!(
            remote,
            RemoteFileDetails {
                size: 1024,
                md5: Some("m".into()),
                sha1: Some("s1".into()),
                sha256: Some("s2".into()),
            }
        );

        let (accept_ranges, _) = client()
            .is_accept_ranges(&url, &RequestDetails::new())
            .await
            .unwrap();
        assert!(accept_ranges);
    }

    #[tokio::test]
    async fn accept_ranges_requires_the_exact_bytes_value() {
        let (port, _) = spawn_scripted_server(vec![
            "HTTP/1.1 200 OK\r\ncontent-length: 0\r\naccept-ranges: none\r\nconnection: close\r\n\r\n",
        ])
        .await;

        let (accept_ranges, meta) = client()
            .is_accept_ranges(
                &format!("http://127.0.0.1:{port}/artifact"),
                &RequestDetails::new(),
            )
            .await
            .unwrap();
        assert_eq!(meta.status, StatusCode::OK);
        assert!(!accept_ranges);
    }

    #[tokio::test]
    async fn read_remote_file_hands_back_the_open_stream() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/artifact")
            .with_status(200)
            .with_body(b"streamed")
            .create_async()
            .await;

        let response = client()
            .read_remote_file(&format!("{}/artifact", server.url()), &RequestDetails::new())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.bytes().await.unwrap().to_vec(), b"streamed");
    }
}
