//! Stem cache: separate once, reuse across runs
//!
//! Cached stems live at `<work_root>/<namespace>/<track>/<stem>.wav`.
//! Providers write into a staging directory first; a finished set is
//! promoted into place with a single rename, so readers never observe a
//! half-written cache entry. Directories a provider returns from outside
//! the staging area (precomputed stems) are served as-is and never
//! promoted or deleted.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Result, StemprepError};
use crate::provider::{Device, StemProvider};
use crate::types::{base_name, missing_stems, StemsDirectory};

pub struct StemCache {
    work_root: PathBuf,
    keep_byproducts: bool,
    force: bool,
}

impl StemCache {
    pub fn new(work_root: impl Into<PathBuf>, keep_byproducts: bool, force: bool) -> Result<Self> {
        let work_root = work_root.into();
        fs::create_dir_all(&work_root).map_err(|e| StemprepError::output_error(&work_root, e))?;
        Ok(Self {
            work_root,
            keep_byproducts,
            force,
        })
    }

    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    /// The cache slot for one track under one provider namespace
    pub fn entry_dir(&self, provider: &dyn StemProvider, audio: &Path) -> PathBuf {
        self.work_root.join(provider.namespace()).join(base_name(audio))
    }

    /// Return a complete stems directory for `audio`, separating only when
    /// the cache cannot serve it.
    ///
    /// A cached entry missing some stems is discarded and rebuilt once in
    /// the same call; `force` skips the cache check entirely.
    pub fn ensure_stems(
        &self,
        provider: &dyn StemProvider,
        audio: &Path,
        device: Device,
    ) -> Result<StemsDirectory> {
        let expected = provider.stems();
        let final_dir = self.entry_dir(provider, audio);

        if final_dir.is_dir() {
            if self.force {
                // the stale entry must go now, or promotion would lose the
                // rename race against it and serve the old stems
                debug!("Force enabled, discarding cached entry {}", final_dir.display());
                fs::remove_dir_all(&final_dir)
                    .map_err(|e| StemprepError::output_error(&final_dir, e))?;
            } else {
                let missing = missing_stems(&final_dir, &expected);
                if missing.is_empty() {
                    debug!("Cache hit for {}", final_dir.display());
                    return Ok(StemsDirectory::new(final_dir, expected));
                }
                warn!(
                    "Cache entry {} is missing stems ({}), re-separating",
                    final_dir.display(),
                    missing.join(", ")
                );
                fs::remove_dir_all(&final_dir)
                    .map_err(|e| StemprepError::output_error(&final_dir, e))?;
            }
        }

        let staging = tempfile::tempdir_in(&self.work_root)
            .map_err(|e| StemprepError::output_error(&self.work_root, e))?;
        let produced = provider.separate(audio, staging.path(), device)?;

        if !produced.starts_with(staging.path()) {
            // out-of-band stems; serve directly, never take ownership
            debug!("Serving out-of-band stems from {}", produced.display());
            return Ok(StemsDirectory::new(produced, expected));
        }

        let missing = missing_stems(&produced, &expected);
        if !missing.is_empty() {
            return Err(StemprepError::IncompleteStems {
                dir: produced,
                missing,
            });
        }

        self.promote(&produced, &final_dir, &expected)?;
        info!("Cached stems at {}", final_dir.display());
        Ok(StemsDirectory::new(final_dir, expected))
    }

    /// Move a finished staging directory into its final cache slot.
    ///
    /// If the rename fails and a complete entry is already in place, a
    /// concurrent worker got there first and its result is accepted.
    fn promote(&self, produced: &Path, final_dir: &Path, expected: &[String]) -> Result<()> {
        if let Some(parent) = final_dir.parent() {
            fs::create_dir_all(parent).map_err(|e| StemprepError::output_error(parent, e))?;
        }
        match fs::rename(produced, final_dir) {
            Ok(()) => Ok(()),
            Err(err) => {
                if final_dir.is_dir() && missing_stems(final_dir, expected).is_empty() {
                    debug!("Lost promotion race for {}, using winner", final_dir.display());
                    Ok(())
                } else {
                    Err(StemprepError::output_error(final_dir, err))
                }
            }
        }
    }

    /// Drop one cache entry after its consumer is done with it.
    ///
    /// No-op when byproducts are kept; refuses to touch anything outside
    /// the work root, so out-of-band directories are safe to pass in.
    pub fn discard(&self, dir: &Path) -> Result<()> {
        if self.keep_byproducts {
            return Ok(());
        }
        if !dir.starts_with(&self.work_root) {
            debug!("Not removing {} (outside work root)", dir.display());
            return Ok(());
        }
        if dir.is_dir() {
            fs::remove_dir_all(dir).map_err(|e| StemprepError::output_error(dir, e))?;
            debug!("Removed byproducts at {}", dir.display());
        }
        Ok(())
    }
}
