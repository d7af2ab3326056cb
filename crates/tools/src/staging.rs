use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use thiserror::Error;

use titledesk_core::domain::staging::StagedFile;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("could not read `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
}

/// Read a batch of files into staged form. All-or-nothing: one unreadable
/// path fails the whole batch and nothing is kept.
pub async fn stage_paths(
    paths: impl IntoIterator<Item = impl AsRef<Path>>,
) -> Result<Vec<StagedFile>, StagingError> {
    let reads = paths.into_iter().map(|path| {
        let path = path.as_ref().to_path_buf();
        async move {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|source| StagingError::Read { path: path.clone(), source })?;
            Ok(stage_bytes(&path, bytes))
        }
    });

    try_join_all(reads).await
}

fn stage_bytes(path: &Path, bytes: Vec<u8>) -> StagedFile {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    StagedFile::new(name, media_type_for(path), bytes)
}

/// Best-effort media type from the file extension. Unknown extensions are
/// declared as plain octets and left for the analysis service to reject.
pub fn media_type_for(path: &Path) -> &'static str {
    let extension =
        path.extension().map(|ext| ext.to_string_lossy().to_ascii_lowercase()).unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "tif" | "tiff" => "image/tiff",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::TempDir;

    use super::{media_type_for, stage_paths, StagingError};

    #[tokio::test]
    async fn batch_staging_preserves_order() {
        let dir = TempDir::new().expect("temp dir");
        let first = dir.path().join("contract.pdf");
        let second = dir.path().join("cd.png");
        std::fs::write(&first, b"contract bytes").expect("write");
        std::fs::write(&second, b"cd bytes").expect("write");

        let staged = stage_paths([&first, &second]).await.expect("both readable");
        assert_eq!(staged.len(), 2);
        assert_eq!(staged[0].name, "contract.pdf");
        assert_eq!(staged[0].media_type, "application/pdf");
        assert_eq!(staged[1].name, "cd.png");
        assert_eq!(staged[1].media_type, "image/png");
    }

    #[tokio::test]
    async fn one_unreadable_path_fails_the_whole_batch() {
        let dir = TempDir::new().expect("temp dir");
        let readable = dir.path().join("contract.pdf");
        std::fs::write(&readable, b"contract bytes").expect("write");
        let missing = dir.path().join("absent.pdf");

        let error = stage_paths([&readable, &missing]).await.expect_err("missing file");
        assert!(matches!(error, StagingError::Read { ref path, .. } if path == &missing));
    }

    #[test]
    fn unknown_extensions_fall_back_to_octet_stream() {
        assert_eq!(media_type_for(Path::new("scan.xyz")), "application/octet-stream");
        assert_eq!(media_type_for(Path::new("photo.JPEG")), "image/jpeg");
    }
}
