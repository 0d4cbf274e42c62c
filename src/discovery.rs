//! Input discovery and scanning

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Result, StemprepError};
use crate::types::AudioFormat;

/// Discovered audio file with basic metadata
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub format: AudioFormat,
    pub size_bytes: u64,
}

/// Scan a path (file or directory) for audio files
pub fn scan(input: &Path, recursive: bool) -> Result<Vec<DiscoveredFile>> {
    if !input.exists() {
        return Err(StemprepError::FileNotFound(input.to_path_buf()));
    }

    let mut files = Vec::new();

    if input.is_file() {
        // Single file mode
        if let Some(file) = try_discover_file(input) {
            files.push(file);
        } else {
            return Err(StemprepError::UnsupportedFormat {
                path: input.to_path_buf(),
                format: input
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            });
        }
    } else if input.is_dir() {
        let walker = if recursive {
            WalkDir::new(input)
        } else {
            WalkDir::new(input).max_depth(1)
        };

        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_file() {
                if let Some(file) = try_discover_file(path) {
                    debug!("Discovered: {}", file.path.display());
                    files.push(file);
                }
            }
        }
    }

    // Deterministic batch order regardless of filesystem iteration order
    files.sort_by(|a, b| a.path.cmp(&b.path));

    info!("Discovered {} audio files", files.len());

    if files.is_empty() {
        warn!("No supported audio files found in {}", input.display());
    }

    Ok(files)
}

/// Try to create a DiscoveredFile if the path is a supported audio format
fn try_discover_file(path: &Path) -> Option<DiscoveredFile> {
    let ext = path.extension()?.to_str()?;
    let format = AudioFormat::from_extension(ext)?;

    let metadata = std::fs::metadata(path).ok()?;
    let size_bytes = metadata.len();

    Some(DiscoveredFile {
        path: path.to_path_buf(),
        format,
        size_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scan_missing_input_fails() {
        let err = scan(Path::new("/nonexistent/input"), true).unwrap_err();
        assert!(matches!(err, StemprepError::FileNotFound(_)));
    }

    #[test]
    fn test_scan_skips_unsupported_extensions() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("a.wav"), b"x").expect("write");
        std::fs::write(dir.path().join("b.txt"), b"x").expect("write");
        std::fs::write(dir.path().join("c.flac"), b"x").expect("write");

        let files = scan(dir.path(), true).expect("scan");
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_scan_single_unsupported_file_errors() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"x").expect("write");

        let err = scan(&path, false).unwrap_err();
        assert!(matches!(err, StemprepError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_scan_order_is_sorted() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("b.wav"), b"x").expect("write");
        std::fs::write(dir.path().join("a.wav"), b"x").expect("write");

        let files = scan(dir.path(), true).expect("scan");
        assert!(files[0].path < files[1].path);
    }
}
