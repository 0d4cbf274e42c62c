//! JSON run report

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, StemprepError};

/// JSON output schema version
const SCHEMA_VERSION: &str = "1.0";

/// Top-level JSON report structure
#[derive(Debug, Serialize, Deserialize)]
pub struct StemprepReport {
    /// Schema version for forward compatibility
    pub version: String,
    /// Run metadata
    pub metadata: ReportMetadata,
    /// Per-track results
    pub tracks: Vec<TrackReport>,
}

/// Report metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// stemprep version that generated this file
    pub generator_version: String,
    /// Timestamp of export
    pub exported_at: String,
    /// Model or backend namespace used for separation
    pub model: String,
    /// Number of tracks
    pub track_count: usize,
}

/// One separated track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackReport {
    /// Input audio path
    pub path: String,
    /// Directory the stems were served from
    pub stems_dir: String,
    /// Stem name -> file path
    pub stems: BTreeMap<String, PathBuf>,
    /// Whether the stems directory survives the run
    pub retained: bool,
}

/// Write the run report to `<output_dir>/stemprep.json`.
///
/// Uses atomic write pattern: writes to a temp file first, then renames.
pub fn write_report(tracks: Vec<TrackReport>, model: &str, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).map_err(|e| StemprepError::output_error(output_dir, e))?;

    let output_path = output_dir.join("stemprep.json");
    // temp file in the same directory so the rename stays on one filesystem
    let temp_path = output_path.with_extension("json.tmp");

    let report = StemprepReport {
        version: SCHEMA_VERSION.to_string(),
        metadata: ReportMetadata {
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: chrono::Utc::now().to_rfc3339(),
            model: model.to_string(),
            track_count: tracks.len(),
        },
        tracks,
    };

    let file = File::create(&temp_path).map_err(|e| StemprepError::output_error(&temp_path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &report).map_err(|e| {
        StemprepError::OutputError {
            path: temp_path.clone(),
            reason: format!("Failed to serialize report: {}", e),
        }
    })?;

    std::fs::rename(&temp_path, &output_path)
        .map_err(|e| StemprepError::output_error(&output_path, e))?;

    info!("Wrote report to {}", output_path.display());
    Ok(output_path)
}
