//! Remote model repository and artifact cache
//!
//! Downloads model artifacts named in the manifest into a per-user cache
//! directory, verifying the checksum fragment carried in the artifact name.
//! Downloads stream to a `.part` file and are renamed into place on success,
//! so an interrupted download never looks like a cached artifact.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::error::{Result, StemprepError};
use crate::repo::manifest::RemoteIndex;

/// Remote single-model lookups backed by a parsed manifest
#[derive(Debug, Clone)]
pub struct RemoteRepo {
    index: RemoteIndex,
}

impl RemoteRepo {
    pub fn new(index: RemoteIndex) -> Self {
        Self { index }
    }

    pub fn contains(&self, signature: &str) -> bool {
        self.index.contains(signature)
    }

    pub fn url(&self, signature: &str) -> Option<&str> {
        self.index.url(signature)
    }

    pub fn signatures(&self) -> Vec<String> {
        self.index.signatures()
    }

    /// Ensure the artifact for `signature` is present locally, downloading on
    /// first use. Returns the cached artifact path.
    pub fn fetch(&self, signature: &str) -> Result<PathBuf> {
        let url = self
            .index
            .url(signature)
            .ok_or_else(|| StemprepError::ModelDownloadError {
                reason: format!("no manifest entry for signature '{}'", signature),
            })?;
        fetch_artifact(url)
    }
}

/// Per-user cache directory for downloaded model artifacts
pub fn cache_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "stemprep", "stemprep").ok_or_else(|| {
        StemprepError::ConfigError("Could not determine cache directory".to_string())
    })?;

    let cache_dir = proj_dirs.cache_dir().join("models");
    fs::create_dir_all(&cache_dir).map_err(|e| StemprepError::OutputError {
        path: cache_dir.clone(),
        reason: format!("Failed to create cache directory: {}", e),
    })?;

    Ok(cache_dir)
}

/// Download an artifact URL into the cache, reusing a verified existing copy
pub fn fetch_artifact(url: &str) -> Result<PathBuf> {
    let file_name = url.rsplit('/').next().unwrap_or(url);
    let dest = cache_dir()?.join(file_name);
    let expected = checksum_fragment(file_name);

    if dest.exists() {
        match expected.as_deref() {
            Some(prefix) if !verify_checksum(&dest, prefix)? => {
                warn!("Cached artifact checksum mismatch, re-downloading {}", file_name);
                fs::remove_file(&dest).ok();
            }
            _ => {
                debug!("Artifact already cached at {}", dest.display());
                return Ok(dest);
            }
        }
    }

    info!("Downloading model artifact {}...", file_name);
    download(url, &dest)?;

    if let Some(prefix) = expected.as_deref() {
        if !verify_checksum(&dest, prefix)? {
            fs::remove_file(&dest).ok();
            return Err(StemprepError::ModelDownloadError {
                reason: format!("checksum verification failed for {}", file_name),
            });
        }
    }

    Ok(dest)
}

/// Stream a download to `dest` with a progress bar, atomically via a `.part` file
fn download(url: &str, dest: &Path) -> Result<()> {
    let response =
        reqwest::blocking::get(url).map_err(|e| StemprepError::ModelDownloadError {
            reason: format!("Failed to download model: {}", e),
        })?;

    if !response.status().is_success() {
        return Err(StemprepError::ModelDownloadError {
            reason: format!("Model download failed with status: {}", response.status()),
        });
    }

    let total_size = response.content_length().unwrap_or(0);
    let pb = ProgressBar::new(total_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n{bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    pb.set_message(format!(
        "Downloading {}",
        dest.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
    ));

    let part = dest.with_extension("part");
    let mut file = fs::File::create(&part).map_err(|e| StemprepError::OutputError {
        path: part.clone(),
        reason: format!("Failed to create artifact file: {}", e),
    })?;

    let mut reader = response;
    let mut buffer = [0u8; 8192];
    let mut downloaded: u64 = 0;

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| StemprepError::ModelDownloadError {
                reason: format!("Failed to read model data: {}", e),
            })?;
        if bytes_read == 0 {
            break;
        }
        file.write_all(&buffer[..bytes_read])
            .map_err(|e| StemprepError::OutputError {
                path: part.clone(),
                reason: format!("Failed to write artifact file: {}", e),
            })?;
        downloaded += bytes_read as u64;
        pb.set_position(downloaded);
    }

    pb.finish_with_message("Download complete");

    fs::rename(&part, dest).map_err(|e| {
        let _ = fs::remove_file(&part);
        StemprepError::OutputError {
            path: dest.to_path_buf(),
            reason: format!("Failed to finalize artifact: {}", e),
        }
    })?;

    info!("Artifact downloaded to {}", dest.display());
    Ok(())
}

/// Extract the hex checksum fragment from an artifact name, if any.
///
/// Manifest artifact names follow `<signature>-<checksum>.<ext>` where the
/// checksum fragment is a prefix of the file's SHA-256 digest in hex.
pub fn checksum_fragment(file_name: &str) -> Option<String> {
    let stem = file_name.rsplit_once('.').map(|(s, _)| s).unwrap_or(file_name);
    let (_, fragment) = stem.split_once('-')?;
    let fragment = fragment.to_lowercase();
    if fragment.len() >= 8 && fragment.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(fragment)
    } else {
        None
    }
}

/// Verify that a file's SHA-256 digest starts with the expected hex prefix
fn verify_checksum(path: &Path, expected_prefix: &str) -> Result<bool> {
    use sha2::{Digest, Sha256};

    let mut file = fs::File::open(path).map_err(|e| StemprepError::OutputError {
        path: path.to_path_buf(),
        reason: format!("Failed to open artifact for verification: {}", e),
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer).map_err(|e| StemprepError::OutputError {
            path: path.to_path_buf(),
            reason: format!("Failed to read artifact for verification: {}", e),
        })?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let digest = hex::encode(hasher.finalize());
    let matches = digest.starts_with(expected_prefix);
    if !matches {
        warn!(
            "Artifact checksum mismatch: expected prefix {}, got {}",
            expected_prefix, digest
        );
    }
    Ok(matches)
}

// =============================================================================
// Cache inspection helpers
// =============================================================================

/// List cached model artifact paths, in sorted order
pub fn list_cached_models() -> Result<Vec<PathBuf>> {
    let dir = cache_dir()?;
    let mut paths: Vec<PathBuf> = fs::read_dir(&dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) != Some("part"))
        .collect();
    paths.sort();
    Ok(paths)
}

/// Total size in bytes of all cached artifacts
pub fn cache_size() -> Result<u64> {
    let mut total = 0;
    for path in list_cached_models()? {
        total += fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
    }
    Ok(total)
}

/// Remove every cached artifact
pub fn clear_cache() -> Result<()> {
    for path in list_cached_models()? {
        debug!("Removing cached artifact {}", path.display());
        fs::remove_file(&path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_fragment_extraction() {
        assert_eq!(
            checksum_fragment("955717e8-8726e21a.th"),
            Some("8726e21a".to_string())
        );
        // Non-hex suffix carries no checksum
        assert_eq!(checksum_fragment("abcd-model.th"), None);
        // No hyphen, no checksum
        assert_eq!(checksum_fragment("plainmodel.th"), None);
        // Too short to be meaningful
        assert_eq!(checksum_fragment("abcd-ff.th"), None);
    }

    #[test]
    fn test_verify_checksum_prefix() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("artifact.th");
        std::fs::write(&path, b"model bytes").expect("write");

        // sha256("model bytes") starts with a fixed digest; verify against the
        // real prefix and a wrong one
        use sha2::{Digest, Sha256};
        let digest = hex::encode(Sha256::digest(b"model bytes"));
        assert!(verify_checksum(&path, &digest[..8]).expect("verify"));
        assert!(!verify_checksum(&path, "00000000").expect("verify"));
    }
}
