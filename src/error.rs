//! Unified error types for stemprep
//!
//! Error strategy:
//! - Per-file errors (mapping lookups, incomplete stems, decode): Recoverable, skip and continue
//! - Configuration errors (duplicate signatures, ambiguous repositories): Fatal, abort batch
//!
//! All errors include actionable suggestions where possible.

use std::path::PathBuf;
use thiserror::Error;

use crate::suggest::render_not_found;

/// Supported audio formats for helpful error messages
pub const SUPPORTED_FORMATS: &str = "MP3, WAV, FLAC, AIFF";

/// Top-level error type for stemprep operations
#[derive(Debug, Error)]
pub enum StemprepError {
    // =========================================================================
    // Recoverable errors - skip file, continue batch
    // =========================================================================
    #[error("{}", render_not_found(.name, .available, .suggestions))]
    ModelNotFound {
        name: String,
        available: Vec<String>,
        suggestions: Vec<String>,
    },

    #[error("No stems mapping entry for '{}'\n  Tip: Add the file to the stems dictionary, or use a model-backed provider", .path.display())]
    MappingNotFound { path: PathBuf },

    #[error("Mapped stems directory for '{}' is missing or incomplete: {}\n  Tip: Re-run the out-of-band separation, or remove the entry from the mapping", .audio.display(), .dir.display())]
    StemsDirectoryMissing { audio: PathBuf, dir: PathBuf },

    #[error("Stems directory {} is missing expected stems: {}", .dir.display(), .missing.join(", "))]
    IncompleteStems { dir: PathBuf, missing: Vec<String> },

    #[error("Failed to decode audio file '{path}': {reason}\n  Supported formats: {SUPPORTED_FORMATS}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Unsupported audio format for '{path}': {format}\n  Supported formats: {SUPPORTED_FORMATS}")]
    UnsupportedFormat { path: PathBuf, format: String },

    #[error("File not found: '{0}'\n  Tip: Check the path exists and is accessible")]
    FileNotFound(PathBuf),

    #[error("Model inference failed: {reason}\n  Tip: This may indicate insufficient memory or an incompatible model file")]
    InferenceError { reason: String },

    // =========================================================================
    // Fatal errors - abort entire batch
    // =========================================================================
    #[error("Model '{name}' is provided by more than one repository source ({})\n  Tip: Remove the duplicate from one source; stemprep never silently picks a priority order", .sources.join(", "))]
    ResolutionAmbiguous { name: String, sources: Vec<String> },

    #[error("Duplicate model signature '{signature}' in repository manifest\n  Tip: Signatures must be unique within a repository source")]
    DuplicateSignature { signature: String },

    #[error("Missing optional dependency: {dependency}\n  To fix: {hint}")]
    OptionalDependencyMissing { dependency: String, hint: String },

    #[error("Model download failed: {reason}\n  Tip: Check network connectivity, or place the model file in a local repository and pass --repo")]
    ModelDownloadError { reason: String },

    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output directory")]
    OutputError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for stemprep operations
pub type Result<T> = std::result::Result<T, StemprepError>;

impl StemprepError {
    /// Returns true if this error is recoverable (should skip file, continue batch)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StemprepError::ModelNotFound { .. }
                | StemprepError::MappingNotFound { .. }
                | StemprepError::StemsDirectoryMissing { .. }
                | StemprepError::IncompleteStems { .. }
                | StemprepError::DecodeError { .. }
                | StemprepError::UnsupportedFormat { .. }
                | StemprepError::FileNotFound(_)
                | StemprepError::InferenceError { .. }
        )
    }

    /// Create a decode error with context about the issue
    pub fn decode_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StemprepError::DecodeError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!(
                    "Permission denied. Check that you have write access to {}",
                    path.display()
                )
            }
            std::io::ErrorKind::NotFound => {
                format!(
                    "Directory does not exist: {}",
                    path.parent().map(|p| p.display().to_string()).unwrap_or_default()
                )
            }
            _ => err.to_string(),
        };
        StemprepError::OutputError { path, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_not_found_is_recoverable() {
        let err = StemprepError::ModelNotFound {
            name: "x".to_string(),
            available: vec![],
            suggestions: vec![],
        };
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_duplicate_signature_is_fatal() {
        let err = StemprepError::DuplicateSignature {
            signature: "abcd".to_string(),
        };
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_optional_dependency_message_names_remediation() {
        let err = StemprepError::OptionalDependencyMissing {
            dependency: "onnxruntime (ort)".to_string(),
            hint: "cargo build --release --features stems".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("onnxruntime"));
        assert!(msg.contains("--features stems"));
    }
}
