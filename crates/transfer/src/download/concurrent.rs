use crate::checksum;
use crate::checksum::Digester;
use crate::client::ResponseMeta;
use crate::client::TransferClient;
use crate::error::join_cleanup;
use crate::error::ErrContext;
use crate::error::TransferError;
use crate::fs;
use crate::progress::ProgressGuard;
use crate::progress::ProgressId;
use crate::progress::ProgressReporter;
use crate::request::RequestDetails;
use crate::retry::Attempt;
use camino::Utf8Path;
use log::info;
use log::warn;
use reqwest::Method;
use reqwest::StatusCode;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;

/// Describes a concurrent chunked download.
#[derive(Debug, Clone, Default)]
pub struct ConcurrentDownloadFlags {
    pub file_name: String,
    pub download_path: String,
    /// Display path, used only for progress reporting.
    pub relative_path: String,
    pub local_file_name: String,
    pub local_path: String,
    pub expected_sha1: Option<String>,
    pub expected_sha256: Option<String>,
    pub file_size: i64,
    pub split_count: usize,
    pub explode: bool,
    pub bypass_archive_inspection: bool,
    pub skip_checksum: bool,
}

/// One byte range of the target resource, fetched as a single 206 response.
/// `end` is exclusive; the wire Range header is inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Chunk {
    pub(crate) index: usize,
    pub(crate) start: u64,
    pub(crate) end: u64,
}

impl Chunk {
    pub(crate) fn range_header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end as i64 - 1)
    }
}

/// Splits `[0, file_size)` into `split_count` contiguous ranges; the last
/// range absorbs the remainder.
pub(crate) fn partition(file_size: u64, split_count: usize) -> Vec<Chunk> {
    let chunk_size = file_size / split_count as u64;
    let remainder = file_size % split_count as u64;
    (0..split_count)
        .map(|index| {
            let start = chunk_size * index as u64;
            let mut end = chunk_size * (index as u64 + 1);
            if index == split_count - 1 {
                end += remainder;
            }
            Chunk { index, start, end }
        })
        .collect()
}

impl TransferClient {
    /// Downloads a file by chunks, concurrently.
    ///
    /// On success the returned meta is that of the last chunk, with status
    /// 206. When a chunk came back with any other status the first such
    /// response is returned without error and nothing is written to the
    /// destination; the caller must inspect the status. The staging
    /// directory for chunk files is removed on every exit path.
    pub async fn download_file_concurrently(
        &self,
        flags: &ConcurrentDownloadFlags,
        log_msg_prefix: &str,
        request: &RequestDetails,
        progress: Option<Arc<dyn ProgressReporter>>,
    ) -> Result<ResponseMeta, TransferError> {
        let temp_dir = fs::create_temp_dir()?;
        let result = self
            .download_and_merge(flags, log_msg_prefix, request, progress, temp_dir.path())
            .await;
        join_cleanup(result, fs::remove_temp_dir(temp_dir))
    }

    async fn download_and_merge(
        &self,
        flags: &ConcurrentDownloadFlags,
        log_msg_prefix: &str,
        request: &RequestDetails,
        progress: Option<Arc<dyn ProgressReporter>>,
        temp_dir: &Path,
    ) -> Result<ResponseMeta, TransferError> {
        let guard = progress.as_ref().map(|progress| {
            ProgressGuard::begin(progress.clone(), flags.file_size, "", &flags.relative_path)
        });
        let worker_progress = match (&progress, &guard) {
            (Some(progress), Some(guard)) => Some((progress.clone(), guard.id())),
            _ => None,
        };

        let (chunk_paths, meta) = self
            .download_chunks_concurrently(flags, log_msg_prefix, request, temp_dir, worker_progress)
            .await?;
        if meta.status != StatusCode::PARTIAL_CONTENT {
            return Ok(meta);
        }

        let destination = fs::create_file_path(&flags.local_path, &flags.local_file_name)?;
        match tokio::fs::remove_file(&destination).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(TransferError::Io {
                    context: format!("removing existing {destination}"),
                    source: err,
                })
            }
        }

        if let Some(guard) = &guard {
            guard.set_merging(true);
        }
        merge_chunks(&chunk_paths, flags, &destination).await?;

        if flags.explode {
            self.extract_archive(
                &flags.local_path,
                &flags.local_file_name,
                &flags.file_name,
                log_msg_prefix,
                flags.bypass_archive_inspection,
            )?;
        }
        info!("{log_msg_prefix}Done downloading.");
        Ok(meta)
    }

    async fn download_chunks_concurrently(
        &self,
        flags: &ConcurrentDownloadFlags,
        log_msg_prefix: &str,
        request: &RequestDetails,
        temp_dir: &Path,
        progress: Option<(Arc<dyn ProgressReporter>, ProgressId)>,
    ) -> Result<(Vec<PathBuf>, ResponseMeta), TransferError> {
        let split_count = flags.split_count.max(1);
        let chunks = partition(flags.file_size.max(0) as u64, split_count);
        let stop = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(split_count);
        for chunk in chunks {
            // Best-effort fast fail: no point dispatching further chunks
            // once one already came back with an error or a bad status.
            if stop.load(Ordering::Relaxed) {
                break;
            }
            let client = self.clone();
            let request = request.clone();
            let stop = stop.clone();
            let progress = progress.clone();
            let download_path = flags.download_path.clone();
            let log_msg_prefix = log_msg_prefix.to_string();
            let temp_dir = temp_dir.to_path_buf();
            handles.push(tokio::spawn(async move {
                let result = client
                    .download_file_range(
                        &download_path,
                        chunk,
                        &log_msg_prefix,
                        &temp_dir,
                        request,
                        progress,
                    )
                    .await;
                match &result {
                    Err(_) => stop.store(true, Ordering::Relaxed),
                    Ok((_, meta)) if meta.status != StatusCode::PARTIAL_CONTENT => {
                        stop.store(true, Ordering::Relaxed)
                    }
                    Ok(_) => {}
                }
                result
            }));
        }

        // Awaiting every started worker is the join point; each worker owns
        // exactly one slot.
        let mut slots = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => slots.push(result),
                Err(err) => slots.push(Err(TransferError::Io {
                    context: "chunk download task aborted".into(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, err),
                })),
            }
        }

        let mut chunk_paths = Vec::with_capacity(slots.len());
        let mut unexpected: Option<ResponseMeta> = None;
        let mut last_meta: Option<ResponseMeta> = None;
        for slot in slots {
            let (path, meta) = slot?;
            if meta.status != StatusCode::PARTIAL_CONTENT && unexpected.is_none() {
                unexpected = Some(meta.clone());
            }
            if let Some(path) = path {
                chunk_paths.push(path);
            }
            last_meta = Some(meta);
        }
        if let Some(meta) = unexpected {
            return Ok((chunk_paths, meta));
        }
        last_meta
            .map(|meta| (chunk_paths, meta))
            .ok_or_else(|| TransferError::Io {
                context: "no download chunks were dispatched".into(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "empty chunk set"),
            })
    }

    /// Downloads one chunk, retrying per the client's policy. The handler
    /// performs exactly one ranged GET per attempt.
    async fn download_file_range(
        &self,
        download_path: &str,
        chunk: Chunk,
        log_msg_prefix: &str,
        temp_dir: &Path,
        mut request: RequestDetails,
        progress: Option<(Arc<dyn ProgressReporter>, ProgressId)>,
    ) -> Result<(Option<PathBuf>, ResponseMeta), TransferError> {
        request
            .headers
            .insert("Range".into(), chunk.range_header());
        let chunk_prefix = format!("{}[{}]: ", log_msg_prefix, chunk.index);
        let executor = self.retry_executor(
            &chunk_prefix,
            format!(
                "Failure occurred while downloading part {} of {}",
                chunk.index, download_path
            ),
        );
        executor
            .execute(|| {
                let progress = progress.clone();
                let chunk_prefix = chunk_prefix.clone();
                let request = request.clone();
                async move {
                    match self
                        .do_download_file_range(
                            download_path,
                            chunk,
                            &chunk_prefix,
                            temp_dir,
                            &request,
                            progress,
                        )
                        .await
                    {
                        Ok((path, meta)) => {
                            if meta.status.is_server_error() {
                                warn!(
                                    "{}The server response: {}",
                                    chunk_prefix,
                                    meta.status_line()
                                );
                                return Attempt::Retry(None);
                            }
                            Attempt::Complete((path, meta))
                        }
                        Err(err) => Attempt::from_error(err),
                    }
                }
            })
            .await
    }

    async fn do_download_file_range(
        &self,
        download_path: &str,
        chunk: Chunk,
        log_msg_prefix: &str,
        temp_dir: &Path,
        request: &RequestDetails,
        progress: Option<(Arc<dyn ProgressReporter>, ProgressId)>,
    ) -> Result<(Option<PathBuf>, ResponseMeta), TransferError> {
        let outcome = self
            .dispatch(Method::GET, download_path, None, true, request)
            .await?;
        let meta = ResponseMeta::from_response(&outcome.response);
        if meta.status != StatusCode::PARTIAL_CONTENT {
            return Ok((None, meta));
        }
        info!("{}{}...", log_msg_prefix, meta.status_line());

        let temp_file = tempfile::Builder::new()
            .prefix(&format!("{}_", chunk.index))
            .tempfile_in(temp_dir)
            .context(format!("creating temp file for chunk {}", chunk.index))?;
        let (file, temp_path) = temp_file.keep().map_err(|err| TransferError::Io {
            context: format!("keeping temp file for chunk {}", chunk.index),
            source: err.error,
        })?;
        let mut file = tokio::fs::File::from_std(file);

        let mut response = outcome.response;
        while let Some(bytes) = response.chunk().await? {
            file.write_all(&bytes)
                .await
                .context(format!("writing chunk {}", chunk.index))?;
            if let Some((reporter, id)) = &progress {
                reporter.advance(*id, bytes.len() as u64);
            }
        }
        file.flush()
            .await
            .context(format!("flushing chunk {}", chunk.index))?;
        Ok((Some(temp_path), meta))
    }
}

/// Concatenates chunk files in ascending index order into the destination,
/// feeding the digester over the same linear byte stream, and verifies the
/// digest unless verification is skipped.
async fn merge_chunks(
    chunk_paths: &[PathBuf],
    flags: &ConcurrentDownloadFlags,
    destination: &Utf8Path,
) -> Result<(), TransferError> {
    let mut dest_file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(destination)
        .await
        .context(format!("creating {destination}"))?;

    let expected = checksum::expected_checksum(
        flags.expected_sha1.as_deref(),
        flags.expected_sha256.as_deref(),
    );
    let mut digester = expected
        .as_ref()
        .map(|expected| Digester::new(expected.kind));

    let mut buffer = vec![0u8; 64 * 1024];
    for path in chunk_paths {
        let mut chunk_file = tokio::fs::File::open(path)
            .await
            .context(format!("opening chunk file {}", path.display()))?;
        loop {
            let read = chunk_file
                .read(&mut buffer)
                .await
                .context(format!("reading chunk file {}", path.display()))?;
            if read == 0 {
                break;
            }
            if let Some(digester) = digester.as_mut() {
                digester.update(&buffer[..read]);
            }
            dest_file
                .write_all(&buffer[..read])
                .await
                .context(format!("writing {destination}"))?;
        }
    }
    dest_file
        .flush()
        .await
        .context(format!("flushing {destination}"))?;

    if flags.skip_checksum {
        return Ok(());
    }
    match (expected, digester) {
        (Some(expected), Some(digester)) => checksum::validate_checksum(
            &expected,
            &digester.finalize_hex(),
            &flags.local_file_name,
        ),
        _ => Ok(()),
    }
}
