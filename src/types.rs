//! Core data types for stemprep
//!
//! These types represent the domain model and flow through the separation
//! and caching layers.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// =============================================================================
// Stem vocabulary
// =============================================================================

/// The default four-source stem vocabulary
pub const DEFAULT_SOURCES: [&str; 4] = ["drums", "bass", "other", "vocals"];

/// Extended six-source vocabulary used by six-stem models
pub const SIX_SOURCES: [&str; 6] = ["drums", "bass", "other", "vocals", "guitar", "piano"];

/// Default stem vocabulary as owned strings
pub fn default_sources() -> Vec<String> {
    DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Stems directory
// =============================================================================

/// A provider-namespaced directory holding one audio file per stem.
///
/// A `StemsDirectory` handed to a caller is always complete: every expected
/// stem file exists and is non-empty. Partially-written directories are never
/// exposed; the cache layer classifies them as missing and re-runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StemsDirectory {
    path: PathBuf,
    stems: Vec<String>,
}

impl StemsDirectory {
    pub fn new(path: PathBuf, stems: Vec<String>) -> Self {
        Self { path, stems }
    }

    /// Directory containing the stem files
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stem names this directory is expected to hold
    pub fn stems(&self) -> &[String] {
        &self.stems
    }

    /// Path of a single stem file inside this directory
    pub fn stem_path(&self, stem: &str) -> PathBuf {
        self.path.join(format!("{}.wav", stem))
    }

    /// Names of expected stems whose files are absent or empty
    pub fn missing_stems(&self) -> Vec<String> {
        missing_stems(&self.path, &self.stems)
    }

    /// True when every expected stem file exists and is non-empty
    pub fn is_complete(&self) -> bool {
        self.missing_stems().is_empty()
    }
}

/// Names of expected stems missing from `dir` (absent or zero-length files)
pub fn missing_stems(dir: &Path, expected: &[String]) -> Vec<String> {
    expected
        .iter()
        .filter(|stem| {
            let file = dir.join(format!("{}.wav", stem));
            match std::fs::metadata(&file) {
                Ok(meta) => meta.len() == 0,
                Err(_) => true,
            }
        })
        .cloned()
        .collect()
}

/// Normalized base name of an audio input, used as the cache key component
pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "track".to_string())
}

// =============================================================================
// Audio buffer types
// =============================================================================

/// Stereo audio buffer passed through the model layer (full fidelity)
#[derive(Debug, Clone)]
pub struct StereoBuffer {
    /// Left channel samples normalized to [-1.0, 1.0]
    pub left: Vec<f32>,
    /// Right channel samples normalized to [-1.0, 1.0]
    pub right: Vec<f32>,
    /// Sample rate in Hz (typically 44100)
    pub sample_rate: u32,
}

impl StereoBuffer {
    pub fn new(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            left,
            right,
            sample_rate,
        }
    }

    /// Number of samples per channel
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate > 0 {
            self.len() as f64 / self.sample_rate as f64
        } else {
            0.0
        }
    }
}

// =============================================================================
// Supported formats
// =============================================================================

/// Audio formats accepted by input discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
    Flac,
    Aiff,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "wav" => Some(AudioFormat::Wav),
            "flac" => Some(AudioFormat::Flac),
            "aiff" | "aif" => Some(AudioFormat::Aiff),
            _ => None,
        }
    }

    /// Check if a path has a supported extension
    pub fn is_supported_path(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .is_some()
    }
}
