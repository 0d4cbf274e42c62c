//! Stem-separation providers
//!
//! A provider turns one audio file into a directory of per-stem WAVs under
//! a caller-chosen output root. Three implementations cover the supported
//! workflows: model-backed inference, a user-supplied separator callback,
//! and precomputed stems looked up from a mapping file. The caching layer
//! sits above providers and treats them uniformly through this trait.

pub mod custom;
pub mod model_backed;
pub mod precomputed;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::Result;
use crate::types::default_sources;

pub use custom::{CustomSeparatorProvider, Separator};
pub use model_backed::ModelBackedProvider;
pub use precomputed::PrecomputedStemProvider;

/// Inference device selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    /// First available provider in preference order
    Auto,
    Cpu,
    CoreMl,
    DirectMl,
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Device::Auto),
            "cpu" => Ok(Device::Cpu),
            "coreml" => Ok(Device::CoreMl),
            "directml" => Ok(Device::DirectMl),
            other => Err(format!(
                "unknown device '{}' (expected auto, cpu, coreml, or directml)",
                other
            )),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Device::Auto => "auto",
            Device::Cpu => "cpu",
            Device::CoreMl => "coreml",
            Device::DirectMl => "directml",
        };
        write!(f, "{}", name)
    }
}

/// A source of separated stems for one audio file.
///
/// `separate` produces (or locates) a directory containing one
/// `<stem>.wav` per expected stem and returns its path. Implementations
/// must be shareable across worker threads.
pub trait StemProvider: Send + Sync {
    /// Produce stems for `audio`, writing under `output_root` when the
    /// provider generates files itself
    fn separate(&self, audio: &Path, output_root: &Path, device: Device) -> Result<PathBuf>;

    /// Cache namespace this provider's results live under; distinct
    /// providers must not collide
    fn namespace(&self) -> &str;

    /// Stems this provider produces
    fn stems(&self) -> Vec<String> {
        default_sources()
    }
}
