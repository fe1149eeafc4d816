use crate::auth::apply_authentication;
use crate::client::indent_json;
use crate::client::validate_url;
use crate::client::ResponseMeta;
use crate::client::TransferClient;
use crate::error::ErrContext;
use crate::error::TransferError;
use crate::fs;
use crate::headers::compose_headers;
use crate::progress::ProgressGuard;
use crate::progress::ProgressReporter;
use crate::request::RequestDetails;
use crate::retry::Attempt;
use futures::TryStreamExt;
use log::warn;
use reqwest::header::HeaderValue;
use reqwest::header::CONTENT_LENGTH;
use reqwest::Body;
use reqwest::StatusCode;
use std::sync::Arc;
use tokio::fs::File;
use tokio_util::codec::BytesCodec;
use tokio_util::codec::FramedRead;

const UPLOAD_SUCCESS_STATUSES: [StatusCode; 3] =
    [StatusCode::OK, StatusCode::CREATED, StatusCode::ACCEPTED];

impl TransferClient {
    /// Uploads a local file as a single-stream PUT whose Content-Length is
    /// the measured file size. 200, 201 and 202 are success; 5xx is retried;
    /// any other status is an error carrying the status line.
    ///
    /// The request body is re-streamed from the file on every attempt, but a
    /// failure mid-body should still be treated as potentially
    /// non-idempotent by callers.
    pub async fn upload_file(
        &self,
        local_path: &str,
        url: &str,
        log_msg_prefix: &str,
        request: &RequestDetails,
        progress: Option<Arc<dyn ProgressReporter>>,
    ) -> Result<(ResponseMeta, Vec<u8>), TransferError> {
        let executor = self.retry_executor(
            log_msg_prefix,
            format!("Failure occurred while uploading to {url}"),
        );
        executor
            .execute(|| {
                let progress = progress.clone();
                async move {
                    let (meta, body) = match self
                        .do_upload_file(local_path, url, request, progress)
                        .await
                    {
                        Ok(result) => result,
                        Err(err) => return Attempt::from_error(err),
                    };
                    if meta.status.is_server_error() {
                        warn!(
                            "{}The server response: {}\n{}",
                            log_msg_prefix,
                            meta.status_line(),
                            indent_json(&body)
                        );
                        return Attempt::Retry(None);
                    }
                    match check_upload_status(meta, body) {
                        Ok(result) => Attempt::Complete(result),
                        Err(err) => Attempt::Fatal(err),
                    }
                }
            })
            .await
    }

    /// Uploads from an arbitrary reader with an explicit size. Single
    /// attempt, same success statuses as [`TransferClient::upload_file`].
    pub async fn upload_file_from_reader<R>(
        &self,
        reader: R,
        url: &str,
        request: &RequestDetails,
        size: u64,
    ) -> Result<(ResponseMeta, Vec<u8>), TransferError>
    where
        R: tokio::io::AsyncRead + Send + Sync + 'static,
    {
        let body = Body::wrap_stream(FramedRead::new(reader, BytesCodec::new()));
        let (meta, body) = self.upload_from_body(url, request, size, body).await?;
        check_upload_status(meta, body)
    }

    async fn do_upload_file(
        &self,
        local_path: &str,
        url: &str,
        request: &RequestDetails,
        progress: Option<Arc<dyn ProgressReporter>>,
    ) -> Result<(ResponseMeta, Vec<u8>), TransferError> {
        let file = File::open(local_path)
            .await
            .context(format!("opening {local_path} for upload"))?;
        let size = fs::file_size(&file).await?;
        let guard = progress
            .map(|progress| Arc::new(ProgressGuard::begin(progress, size as i64, "Uploading", url)));
        self.upload_from_body(url, request, size, upload_body(file, guard))
            .await
    }

    async fn upload_from_body(
        &self,
        url: &str,
        request: &RequestDetails,
        size: u64,
        body: Body,
    ) -> Result<(ResponseMeta, Vec<u8>), TransferError> {
        validate_url(url)?;
        let mut headers = compose_headers(request)?;
        headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
        let builder = apply_authentication(self.client.put(url), &request.credentials)
            .headers(headers)
            .body(body);
        let response = self.await_cancellable(builder.send()).await?;
        let meta = ResponseMeta::from_response(&response);
        let body = response.bytes().await?.to_vec();
        Ok((meta, body))
    }
}

fn upload_body(file: File, progress: Option<Arc<ProgressGuard>>) -> Body {
    let stream = FramedRead::new(file, BytesCodec::new());
    match progress {
        Some(guard) => {
            Body::wrap_stream(stream.inspect_ok(move |bytes| guard.advance(bytes.len() as u64)))
        }
        None => Body::wrap_stream(stream),
    }
}

fn check_upload_status(
    meta: ResponseMeta,
    body: Vec<u8>,
) -> Result<(ResponseMeta, Vec<u8>), TransferError> {
    if UPLOAD_SUCCESS_STATUSES.contains(&meta.status) {
        return Ok((meta, body));
    }
    Err(TransferError::UnexpectedStatus {
        status: meta.status_line(),
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}
