use crate::error::ErrContext;
use crate::error::TransferError;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use tempfile::TempDir;

/// Creates the directory a chunked download stages its parts in. The caller
/// owns the handle; dropping it removes the directory as a backstop, but
/// [`remove_temp_dir`] should be called so removal failures are observable.
pub(crate) fn create_temp_dir() -> Result<TempDir, TransferError> {
    tempfile::Builder::new()
        .prefix("transfer-")
        .tempdir()
        .context("creating chunk download directory")
}

pub(crate) fn remove_temp_dir(dir: TempDir) -> Result<(), TransferError> {
    let path = dir.path().to_path_buf();
    dir.close()
        .context(format!("removing chunk download directory {}", path.display()))
}

/// Resolves the destination path for a download, creating the local
/// directory when one is configured.
pub(crate) fn create_file_path(
    local_path: &str,
    file_name: &str,
) -> Result<Utf8PathBuf, TransferError> {
    if local_path.is_empty() {
        return Ok(Utf8PathBuf::from(file_name));
    }
    std::fs::create_dir_all(local_path)
        .context(format!("creating download directory {local_path}"))?;
    Ok(Utf8Path::new(local_path).join(file_name))
}

pub(crate) async fn file_size(file: &tokio::fs::File) -> Result<u64, TransferError> {
    Ok(file
        .metadata()
        .await
        .context("reading upload file metadata")?
        .len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_path_without_local_dir_is_the_bare_name() {
        assert_eq!(
            create_file_path("", "artifact.bin").unwrap(),
            Utf8PathBuf::from("artifact.bin")
        );
    }

    #[test]
    fn file_path_creates_the_local_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let path = create_file_path(nested.to_str().unwrap(), "artifact.bin").unwrap();
        assert!(nested.is_dir());
        assert!(path.as_str().ends_with("artifact.bin"));
    }
}
