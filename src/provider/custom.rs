//! Adapter for user-supplied separation backends

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, StemprepError};
use crate::provider::{Device, StemProvider};
use crate::types::{default_sources, missing_stems};

/// A user-supplied separation backend.
///
/// Implementors write one `<stem>.wav` per stem into a directory under
/// `output_root` and return that directory. Completeness is enforced by
/// the wrapping provider, so implementations only need to do the work.
pub trait Separator: Send + Sync {
    /// Separate `audio` into stem files under `output_root`
    fn separate(&self, audio: &Path, output_root: &Path) -> Result<PathBuf>;

    /// Cache namespace for this backend's results
    fn name(&self) -> &str {
        "custom"
    }

    /// Stems this backend produces
    fn stems(&self) -> Vec<String> {
        default_sources()
    }
}

/// Wraps a `Separator` and validates its output before it enters the cache
pub struct CustomSeparatorProvider {
    inner: Arc<dyn Separator>,
}

impl CustomSeparatorProvider {
    pub fn new(inner: Arc<dyn Separator>) -> Self {
        Self { inner }
    }
}

impl StemProvider for CustomSeparatorProvider {
    fn separate(&self, audio: &Path, output_root: &Path, _device: Device) -> Result<PathBuf> {
        let dir = self.inner.separate(audio, output_root)?;
        debug!("Backend '{}' wrote stems to {}", self.inner.name(), dir.display());

        let missing = missing_stems(&dir, &self.inner.stems());
        if !missing.is_empty() {
            return Err(StemprepError::IncompleteStems { dir, missing });
        }
        Ok(dir)
    }

    fn namespace(&self) -> &str {
        self.inner.name()
    }

    fn stems(&self) -> Vec<String> {
        self.inner.stems()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct PartialSeparator {
        write: Vec<&'static str>,
    }

    impl Separator for PartialSeparator {
        fn separate(&self, audio: &Path, output_root: &Path) -> Result<PathBuf> {
            let dir = output_root.join(crate::types::base_name(audio));
            fs::create_dir_all(&dir)?;
            for stem in &self.write {
                fs::write(dir.join(format!("{}.wav", stem)), b"RIFF")?;
            }
            Ok(dir)
        }
    }

    #[test]
    fn test_complete_output_passes_through() {
        let root = TempDir::new().expect("tempdir");
        let provider = CustomSeparatorProvider::new(Arc::new(PartialSeparator {
            write: vec!["drums", "bass", "other", "vocals"],
        }));
        let dir = provider
            .separate(Path::new("track.wav"), root.path(), Device::Auto)
            .expect("separate");
        assert!(dir.join("vocals.wav").exists());
    }

    #[test]
    fn test_missing_stems_are_reported_by_name() {
        let root = TempDir::new().expect("tempdir");
        let provider = CustomSeparatorProvider::new(Arc::new(PartialSeparator {
            write: vec!["drums", "bass"],
        }));
        let err = provider
            .separate(Path::new("track.wav"), root.path(), Device::Auto)
            .unwrap_err();
        match err {
            StemprepError::IncompleteStems { missing, .. } => {
                assert_eq!(missing, vec!["other".to_string(), "vocals".to_string()]);
            }
            other => panic!("expected IncompleteStems, got {:?}", other),
        }
    }

    #[test]
    fn test_default_namespace_is_custom() {
        let provider = CustomSeparatorProvider::new(Arc::new(PartialSeparator { write: vec![] }));
        assert_eq!(provider.namespace(), "custom");
    }
}
