//! Authenticated, retryable HTTP engine for artifact uploads and downloads.
//!
//! The engine wraps every exchange in a uniform retry policy, composes
//! authentication, tracing and caller headers per attempt, and downloads
//! large binaries either as a single stream or as many concurrent byte-range
//! chunks that are merged and checksum-verified on disk.
//!
//! # Usage
//!
//! A [`TransferClient`] is built once and shared; it is immutable after
//! construction and cheap to clone.
//!
//! ```no_run
//! use transfer::DownloadFileDetails;
//! use transfer::RequestDetails;
//! use transfer::TransferClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), transfer::TransferError> {
//!     let client = TransferClient::builder()
//!         .with_retries(3)
//!         .with_retry_wait_ms(500)
//!         .build()?;
//!
//!     let details = DownloadFileDetails {
//!         download_path: "https://example.com/repo/artifact.tar.gz".into(),
//!         local_path: "/tmp/downloads".into(),
//!         local_file_name: "artifact.tar.gz".into(),
//!         ..Default::default()
//!     };
//!     let meta = client
//!         .download_file(&details, "", &RequestDetails::new(), false, false)
//!         .await?;
//!     println!("server answered {}", meta.status);
//!     Ok(())
//! }
//! ```
//!
//! For large artifacts on servers that honor `Accept-Ranges: bytes` (see
//! [`TransferClient::is_accept_ranges`]), [`TransferClient::download_file_concurrently`]
//! fetches the file as parallel byte-range chunks and reassembles it on disk.

mod auth;
mod checksum;
mod client;
mod download;
mod error;
mod extract;
mod fs;
mod headers;
mod progress;
mod request;
mod retry;
mod upload;

pub use crate::auth::is_api_key;
pub use crate::checksum::expected_checksum;
pub use crate::checksum::validate_checksum;
pub use crate::checksum::ChecksumKind;
pub use crate::checksum::Digester;
pub use crate::checksum::ExpectedChecksum;
pub use crate::client::RemoteFileDetails;
pub use crate::client::ResponseMeta;
pub use crate::client::SendOutcome;
pub use crate::client::TransferClient;
pub use crate::client::TransferClientBuilder;
pub use crate::download::concurrent::ConcurrentDownloadFlags;
pub use crate::download::DownloadFileDetails;
pub use crate::error::TransferError;
pub use crate::extract::ArchiveExtractor;
pub use crate::headers::set_trace_id_token;
pub use crate::headers::set_user_agent;
pub use crate::headers::user_agent;
pub use crate::progress::ProgressId;
pub use crate::progress::ProgressReporter;
pub use crate::request::Credentials;
pub use crate::request::PreRetryInterceptor;
pub use crate::request::RequestDetails;
pub use crate::retry::Attempt;
pub use crate::retry::RetryExecutor;
pub use reqwest::Method;
pub use reqwest::StatusCode;
pub use tokio_util::sync::CancellationToken;
