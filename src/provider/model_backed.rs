//! Provider backed by a pretrained separation model

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};

use crate::audio;
use crate::error::{Result, StemprepError};
use crate::provider::{Device, StemProvider};
use crate::repo::{self, AnyModelRepo, LoadedAny, ResolvedModel};
use crate::types::base_name;

/// Runs separation through a resolved pretrained model or bag.
///
/// The model name resolves eagerly at construction so misspelled names and
/// ambiguous signatures fail before any audio is touched; the inference
/// runtime loads lazily on the first `separate` call.
pub struct ModelBackedProvider {
    resolved: ResolvedModel,
    namespace: String,
    // loaded on first use; the lock also serializes inference, which is
    // already single-threaded inside the runtime session
    loaded: Mutex<Option<LoadedAny>>,
}

impl ModelBackedProvider {
    /// Resolve `name` against the combined repository
    pub fn new(name: &str, local_repo: Option<&Path>) -> Result<Self> {
        let resolved = AnyModelRepo::new(local_repo)?.resolve(name)?;
        info!("Using model '{}' ({} stems)", name, resolved.sources().len());
        Ok(Self {
            resolved,
            namespace: name.to_string(),
            loaded: Mutex::new(None),
        })
    }

    pub fn resolved(&self) -> &ResolvedModel {
        &self.resolved
    }
}

impl StemProvider for ModelBackedProvider {
    fn separate(&self, audio_path: &Path, output_root: &Path, device: Device) -> Result<PathBuf> {
        let mix = audio::read_stereo_wav(audio_path)?;
        debug!(
            "Separating {} ({:.1}s) with '{}'",
            audio_path.display(),
            mix.duration(),
            self.namespace
        );

        let mut guard = self.loaded.lock().map_err(|_| StemprepError::InferenceError {
            reason: "Failed to acquire model lock".to_string(),
        })?;
        if guard.is_none() {
            *guard = Some(repo::load(&self.resolved, device)?);
        }
        let loaded = guard.as_ref().ok_or_else(|| StemprepError::InferenceError {
            reason: "Model failed to load".to_string(),
        })?;

        let stems = loaded.apply(&mix)?;
        let names = loaded.sources();
        if stems.len() != names.len() {
            return Err(StemprepError::InferenceError {
                reason: format!("Model produced {} stems, expected {}", stems.len(), names.len()),
            });
        }

        let dir = output_root.join(base_name(audio_path));
        std::fs::create_dir_all(&dir)?;
        for (name, buffer) in names.iter().zip(&stems) {
            audio::write_stereo_wav(&dir.join(format!("{}.wav", name)), buffer)?;
        }
        Ok(dir)
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn stems(&self) -> Vec<String> {
        self.resolved.sources().to_vec()
    }
}
