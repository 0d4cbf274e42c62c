//! Pipeline orchestration
//!
//! Coordinates file discovery, parallel separation through the stem cache,
//! and the final JSON report. Workers run on the rayon pool; recoverable
//! per-file errors skip that file and the run continues.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::cache::StemCache;
use crate::config::Settings;
use crate::discovery;
use crate::error::{Result, StemprepError};
use crate::provider::{
    CustomSeparatorProvider, ModelBackedProvider, PrecomputedStemProvider, Separator, StemProvider,
};
use crate::report::{self, TrackReport};

/// Pipeline result summary
#[derive(Debug)]
pub struct PipelineResult {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Build the provider the settings ask for: precomputed mapping when one is
/// given, otherwise a model-backed provider.
pub fn provider_from_settings(settings: &Settings) -> Result<Arc<dyn StemProvider>> {
    match &settings.stems_dict {
        Some(path) => {
            let provider = PrecomputedStemProvider::from_file(path, None)?;
            info!("Using precomputed stems mapping ({} entries)", provider.len());
            Ok(Arc::new(provider))
        }
        None => Ok(Arc::new(ModelBackedProvider::new(
            &settings.model,
            settings.local_repo.as_deref(),
        )?)),
    }
}

/// Wrap a user-supplied backend for use with `run`
pub fn provider_from_separator(separator: Arc<dyn Separator>) -> Arc<dyn StemProvider> {
    Arc::new(CustomSeparatorProvider::new(separator))
}

/// Run the full separation pipeline
pub fn run(settings: &Settings, provider: Arc<dyn StemProvider>) -> Result<PipelineResult> {
    let pipeline_start = Instant::now();

    configure_thread_pool(settings.worker_threads)?;

    info!("Scanning for audio files...");
    let files = discovery::scan(&settings.input, settings.recursive)?;

    if files.is_empty() {
        info!("No audio files found under {}", settings.input.display());
        return Ok(PipelineResult {
            total_files: 0,
            successful: 0,
            failed: 0,
            skipped: 0,
        });
    }
    info!("Found {} audio files", files.len());

    let cache = StemCache::new(
        settings.stems_dir.clone(),
        settings.keep_byproducts,
        settings.force,
    )?;

    let progress_bar = if settings.show_progress {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let skipped = AtomicUsize::new(0);

    let tracks: Vec<TrackReport> = files
        .par_iter()
        .filter_map(|file| {
            let result = separate_single_file(file.path.as_path(), provider.as_ref(), &cache, settings);

            if let Some(ref pb) = progress_bar {
                pb.inc(1);
                pb.set_message(
                    file.path
                        .file_name()
                        .unwrap_or_default()
                        .to_string_lossy()
                        .to_string(),
                );
            }

            match result {
                Ok(track) => {
                    successful.fetch_add(1, Ordering::Relaxed);
                    Some(track)
                }
                Err(e) if e.is_recoverable() => {
                    warn!("Skipping {}: {}", file.path.display(), e);
                    skipped.fetch_add(1, Ordering::Relaxed);
                    None
                }
                Err(e) => {
                    error!("Failed {}: {}", file.path.display(), e);
                    failed.fetch_add(1, Ordering::Relaxed);
                    None
                }
            }
        })
        .collect();

    if let Some(pb) = progress_bar {
        pb.finish_with_message("Separation complete");
    }

    if !tracks.is_empty() {
        report::write_report(tracks, provider.namespace(), &settings.output)?;
    }

    info!(
        "Total pipeline time: {:.2}s",
        pipeline_start.elapsed().as_secs_f64()
    );

    Ok(PipelineResult {
        total_files: files.len(),
        successful: successful.load(Ordering::Relaxed),
        failed: failed.load(Ordering::Relaxed),
        skipped: skipped.load(Ordering::Relaxed),
    })
}

/// Separate one file through the cache and record the result.
///
/// Byproduct cleanup happens only after the entry is fully recorded, and
/// never on a failed file, so partial failures remain inspectable.
fn separate_single_file(
    audio: &Path,
    provider: &dyn StemProvider,
    cache: &StemCache,
    settings: &Settings,
) -> Result<TrackReport> {
    let stems_dir = cache.ensure_stems(provider, audio, settings.device)?;

    let mut stems = BTreeMap::new();
    for stem in stems_dir.stems() {
        stems.insert(stem.clone(), stems_dir.stem_path(stem));
    }

    let track = TrackReport {
        path: audio.to_string_lossy().to_string(),
        stems_dir: stems_dir.path().to_string_lossy().to_string(),
        stems,
        retained: settings.keep_byproducts || !stems_dir.path().starts_with(cache.work_root()),
    };

    cache.discard(stems_dir.path())?;
    debug!("Finished {}", audio.display());
    Ok(track)
}

/// Configure the rayon thread pool
fn configure_thread_pool(num_threads: usize) -> Result<()> {
    match rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
    {
        Ok(()) => {
            debug!("Configured thread pool with {} threads", num_threads);
        }
        Err(e) => {
            // already initialized (e.g. in tests) is fine
            if e.to_string().contains("already been initialized") {
                debug!("Thread pool already initialized, using existing pool");
            } else {
                return Err(StemprepError::ConfigError(format!(
                    "Failed to configure thread pool: {}",
                    e
                )));
            }
        }
    }
    Ok(())
}
