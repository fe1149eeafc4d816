use crate::checksum;
use crate::checksum::Digester;
use crate::client::ResponseMeta;
use crate::client::TransferClient;
use crate::error::ErrContext;
use crate::error::TransferError;
use crate::fs;
use crate::progress::ProgressGuard;
use crate::progress::ProgressReporter;
use crate::request::RequestDetails;
use crate::retry::Attempt;
use log::debug;
use log::warn;
use reqwest::Method;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

pub(crate) mod concurrent;

#[cfg(test)]
#[path = "download/tests/concurrent.rs"]
mod concurrent_tests;

/// Describes a single-stream download: where the artifact lives, where it
/// lands locally, and which digest the result is checked against.
///
/// When both digests are present only the SHA-1 is verified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct DownloadFileDetails {
    pub file_name: String,
    pub download_path: String,
    /// Display path, used only for progress reporting.
    pub relative_path: String,
    pub local_path: String,
    pub local_file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_sha1: Option<String>,
    #[serde(skip)]
    pub expected_sha256: Option<String>,
    pub size: i64,
    pub skip_checksum: bool,
}

impl TransferClient {
    /// Bulk-downloads a file. A non-200 response is returned without writing
    /// anything; the caller inspects the status.
    pub async fn download_file(
        &self,
        details: &DownloadFileDetails,
        log_msg_prefix: &str,
        request: &RequestDetails,
        explode: bool,
        bypass_archive_inspection: bool,
    ) -> Result<ResponseMeta, TransferError> {
        self.download_file_with_progress(
            details,
            log_msg_prefix,
            request,
            explode,
            bypass_archive_inspection,
            None,
        )
        .await
    }

    pub async fn download_file_with_progress(
        &self,
        details: &DownloadFileDetails,
        log_msg_prefix: &str,
        request: &RequestDetails,
        explode: bool,
        bypass_archive_inspection: bool,
        progress: Option<Arc<dyn ProgressReporter>>,
    ) -> Result<ResponseMeta, TransferError> {
        let (meta, _) = self
            .download_file_inner(
                details,
                log_msg_prefix,
                true,
                request,
                explode,
                bypass_archive_inspection,
                progress,
            )
            .await?;
        Ok(meta)
    }

    /// Like [`TransferClient::download_file`], but a redirect is not
    /// followed: the captured target URL is returned alongside the 3xx
    /// response, without retrying.
    pub async fn download_file_no_redirect(
        &self,
        download_path: &str,
        local_path: &str,
        file_name: &str,
        request: &RequestDetails,
    ) -> Result<(ResponseMeta, Option<String>), TransferError> {
        let details = DownloadFileDetails {
            download_path: download_path.into(),
            local_path: local_path.into(),
            local_file_name: file_name.into(),
            file_name: file_name.into(),
            ..Default::default()
        };
        self.download_file_inner(&details, "", false, request, false, false, None)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn download_file_inner(
        &self,
        details: &DownloadFileDetails,
        log_msg_prefix: &str,
        follow_redirect: bool,
        request: &RequestDetails,
        explode: bool,
        bypass_archive_inspection: bool,
        progress: Option<Arc<dyn ProgressReporter>>,
    ) -> Result<(ResponseMeta, Option<String>), TransferError> {
        let executor = self.retry_executor(
            log_msg_prefix,
            format!(
                "Failure occurred while downloading {}",
                details.download_path
            ),
        );
        executor
            .execute(|| {
                let progress = progress.clone();
                async move {
                    let (meta, redirect_url) = match self
                        .do_download_file(
                            details,
                            log_msg_prefix,
                            follow_redirect,
                            request,
                            explode,
                            bypass_archive_inspection,
                            progress,
                        )
                        .await
                    {
                        Ok(result) => result,
                        Err(err) => return Attempt::from_error(err),
                    };
                    if meta.status.is_server_error() {
                        warn!(
                            "{}The server response: {}",
                            log_msg_prefix,
                            meta.status_line()
                        );
                        return Attempt::Retry(None);
                    }
                    Attempt::Complete((meta, redirect_url))
                }
            })
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn do_download_file(
        &self,
        details: &DownloadFileDetails,
        log_msg_prefix: &str,
        follow_redirect: bool,
        request: &RequestDetails,
        explode: bool,
        bypass_archive_inspection: bool,
        progress: Option<Arc<dyn ProgressReporter>>,
    ) -> Result<(ResponseMeta, Option<String>), TransferError> {
        let outcome = self
            .dispatch(
                Method::GET,
                &details.download_path,
                None,
                follow_redirect,
                request,
            )
            .await?;
        let meta = ResponseMeta::from_response(&outcome.response);
        if let Some(redirect_url) = outcome.redirect_url {
            debug!("{log_msg_prefix}Blocking HTTP redirect to {redirect_url}");
            return Ok((meta, Some(redirect_url)));
        }
        if meta.status != StatusCode::OK {
            return Ok((meta, None));
        }

        self.save_to_file(details, outcome.response, progress)
            .await?;

        if explode {
            self.extract_archive(
                &details.local_path,
                &details.local_file_name,
                &details.file_name,
                log_msg_prefix,
                bypass_archive_inspection,
            )?;
        }
        Ok((meta, None))
    }

    /// Streams the body to the destination file, feeding the digester and
    /// the progress entry along the way, then verifies the digest.
    async fn save_to_file(
        &self,
        details: &DownloadFileDetails,
        mut response: reqwest::Response,
        progress: Option<Arc<dyn ProgressReporter>>,
    ) -> Result<(), TransferError> {
        let file_path = fs::create_file_path(&details.local_path, &details.local_file_name)?;
        let mut out = tokio::fs::File::create(&file_path)
            .await
            .context(format!("creating {file_path}"))?;

        let content_length = response.content_length().unwrap_or(0) as i64;
        let guard = progress.map(|progress| {
            ProgressGuard::begin(progress, content_length, "", &details.relative_path)
        });

        let expected = checksum::expected_checksum(
            details.expected_sha1.as_deref(),
            details.expected_sha256.as_deref(),
        );
        let mut digester = match &expected {
            Some(expected) if !details.skip_checksum => Some(Digester::new(expected.kind)),
            _ => None,
        };

        while let Some(bytes) = response.chunk().await? {
            if let Some(digester) = digester.as_mut() {
                digester.update(&bytes);
            }
            out.write_all(&bytes)
                .await
                .context(format!("writing {file_path}"))?;
            if let Some(guard) = &guard {
                guard.advance(bytes.len() as u64);
            }
        }
        out.flush().await.context(format!("flushing {file_path}"))?;

        match (expected, digester) {
            (Some(expected), Some(digester)) => checksum::validate_checksum(
                &expected,
                &digester.finalize_hex(),
                &details.local_file_name,
            ),
            _ => Ok(()),
        }
    }
}
