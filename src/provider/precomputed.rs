//! Provider that looks up stems separated out of band

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, StemprepError};
use crate::provider::{Device, StemProvider};
use crate::types::{default_sources, missing_stems};

/// Serves stems that were separated ahead of time.
///
/// The mapping is a flat JSON object from audio path (exactly as it will be
/// passed to `separate`, no canonicalization) to the directory holding that
/// track's stems. Mapped directories are out-of-band data: they are returned
/// as-is and never promoted into or removed from the stem cache.
pub struct PrecomputedStemProvider {
    mapping: BTreeMap<String, PathBuf>,
    stems: Vec<String>,
}

impl PrecomputedStemProvider {
    pub fn new(mapping: BTreeMap<String, PathBuf>, stems: Vec<String>) -> Self {
        Self { mapping, stems }
    }

    /// Load a mapping file written by `save` (or by hand)
    pub fn from_file(path: &Path, stems: Option<Vec<String>>) -> Result<Self> {
        if !path.exists() {
            return Err(StemprepError::FileNotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        let mapping: BTreeMap<String, PathBuf> = serde_json::from_str(&text)
            .map_err(|e| StemprepError::ConfigError(format!("stems mapping {}: {}", path.display(), e)))?;
        debug!("Loaded {} mapping entries from {}", mapping.len(), path.display());
        Ok(Self::new(mapping, stems.unwrap_or_else(default_sources)))
    }

    /// Write the mapping as pretty JSON, atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.mapping)
            .map_err(|e| StemprepError::ConfigError(format!("serializing stems mapping: {}", e)))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| StemprepError::output_error(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| StemprepError::output_error(path, e))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}

impl StemProvider for PrecomputedStemProvider {
    fn separate(&self, audio: &Path, _output_root: &Path, _device: Device) -> Result<PathBuf> {
        let key = audio.to_string_lossy();
        let dir = self.mapping.get(key.as_ref()).ok_or_else(|| {
            StemprepError::MappingNotFound {
                path: audio.to_path_buf(),
            }
        })?;

        if !dir.is_dir() || !missing_stems(dir, &self.stems).is_empty() {
            return Err(StemprepError::StemsDirectoryMissing {
                audio: audio.to_path_buf(),
                dir: dir.clone(),
            });
        }
        Ok(dir.clone())
    }

    fn namespace(&self) -> &str {
        "precomputed"
    }

    fn stems(&self) -> Vec<String> {
        self.stems.clone()
    }
}
