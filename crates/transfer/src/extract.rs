use camino::Utf8Path;
use std::error::Error;

/// Consumed interface for the archive-extraction step that runs after a
/// successful download with the explode flag set.
///
/// Errors are propagated to the download caller verbatim.
pub trait ArchiveExtractor: Send + Sync {
    fn extract(
        &self,
        local_path: &Utf8Path,
        local_file_name: &str,
        file_name: &str,
        log_msg_prefix: &str,
        bypass_inspection: bool,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}
