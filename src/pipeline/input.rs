//! Input resolution: normalise a user-supplied path or URL to a local file.
//!
//! pdfium opens documents by path, so URL inputs are downloaded into a
//! `TempDir` that lives as long as the `ResolvedInput`. Magic bytes are
//! checked before returning so a mislabelled file fails with a clear input
//! error instead of deep inside pdfium or the zip reader.

use crate::error::NarratorError;
use crate::job::SourceKind;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// The resolved input — either a local path or a downloaded temp file.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; the document was downloaded to a temp directory.
    /// The `TempDir` is kept alive to prevent cleanup until processing completes.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Get the path to the document regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local file of the given kind.
///
/// If the input is a URL, download it to a temporary directory.
/// If the input is a local file, validate it exists and is readable.
pub async fn resolve_input(
    input: &str,
    kind: SourceKind,
    timeout_secs: u64,
) -> Result<ResolvedInput, NarratorError> {
    if is_url(input) {
        download_url(input, kind, timeout_secs).await
    } else {
        resolve_local(input, kind)
    }
}

/// Whether `head` starts with the signature of `kind`.
///
/// PDFs start with `%PDF`; a PPTX is a zip archive and starts with `PK`.
pub fn magic_matches(kind: SourceKind, head: &[u8]) -> bool {
    match kind {
        SourceKind::PagedDocument => head.starts_with(b"%PDF"),
        SourceKind::ExistingDeck => head.starts_with(b"PK"),
    }
}

fn expected_name(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::PagedDocument => "PDF document",
        SourceKind::ExistingDeck => "PPTX slide deck",
    }
}

fn magic_of(head: &[u8]) -> [u8; 4] {
    let mut magic = [0u8; 4];
    let n = head.len().min(4);
    magic[..n].copy_from_slice(&head[..n]);
    magic
}

/// Resolve a local file path, validating existence and magic bytes.
fn resolve_local(path_str: &str, kind: SourceKind) -> Result<ResolvedInput, NarratorError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(NarratorError::FileNotFound { path });
    }
    if path.is_dir() {
        return Err(NarratorError::InvalidInput {
            input: path_str.to_string(),
        });
    }

    match std::fs::File::open(&path) {
        Ok(f) => {
            let mut head = Vec::with_capacity(4);
            f.take(4)
                .read_to_end(&mut head)
                .map_err(|e| NarratorError::Internal(format!("Failed to read source: {e}")))?;
            if !magic_matches(kind, &head) {
                return Err(NarratorError::BadMagic {
                    path,
                    expected: expected_name(kind),
                    magic: magic_of(&head),
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(NarratorError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(NarratorError::FileNotFound { path });
        }
    }

    debug!("Resolved local {}: {}", kind.unit_name(), path.display());
    Ok(ResolvedInput::Local(path))
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(
    url: &str,
    kind: SourceKind,
    timeout_secs: u64,
) -> Result<ResolvedInput, NarratorError> {
    info!("Downloading source from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| NarratorError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            NarratorError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            NarratorError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(NarratorError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let filename = extract_filename(url, kind);

    let temp_dir = TempDir::new().map_err(|e| NarratorError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| NarratorError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    if !magic_matches(kind, &bytes) {
        return Err(NarratorError::BadMagic {
            path: file_path,
            expected: expected_name(kind),
            magic: magic_of(&bytes),
        });
    }

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| NarratorError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Extract a reasonable filename from the URL, falling back to a name with
/// the right extension for `kind`.
fn extract_filename(url: &str, kind: SourceKind) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    match kind {
        SourceKind::PagedDocument => "downloaded.pdf".to_string(),
        SourceKind::ExistingDeck => "downloaded.pptx".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn magic_bytes_per_kind() {
        assert!(magic_matches(SourceKind::PagedDocument, b"%PDF-1.7"));
        assert!(!magic_matches(SourceKind::PagedDocument, b"PK\x03\x04"));
        assert!(magic_matches(SourceKind::ExistingDeck, b"PK\x03\x04"));
        assert!(!magic_matches(SourceKind::ExistingDeck, b""));
    }

    #[test]
    fn filename_falls_back_per_kind() {
        assert_eq!(
            extract_filename("https://example.com/talks/q3.pptx", SourceKind::ExistingDeck),
            "q3.pptx"
        );
        assert_eq!(
            extract_filename("https://example.com/download", SourceKind::PagedDocument),
            "downloaded.pdf"
        );
    }

    #[tokio::test]
    async fn missing_local_file_is_file_not_found() {
        let err = resolve_input("/definitely/not/here.pdf", SourceKind::PagedDocument, 5)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, NarratorError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn mislabelled_file_is_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"hello world")
            .unwrap();
        let err = resolve_input(path.to_str().unwrap(), SourceKind::PagedDocument, 5)
            .await
            .err()
            .unwrap();
        match err {
            NarratorError::BadMagic { magic, .. } => assert_eq!(&magic, b"hell"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
