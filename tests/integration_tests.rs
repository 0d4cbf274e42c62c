//! Integration tests for the stemprep pipeline
//!
//! These tests run the full discovery -> cache -> provider -> report flow
//! with a synthetic backend, so they exercise every layer without network
//! access or an inference runtime.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use stemprep::config::Settings;
use stemprep::provider::PrecomputedStemProvider;
use stemprep::{pipeline, Result, Separator, StemprepError};

/// Generate a sine wave WAV file for testing
///
/// Creates a mono 16-bit WAV file at the specified path.
fn generate_sine_wav(path: &Path, frequency_hz: f32, duration_secs: f32, sample_rate: u32) {
    use std::f32::consts::PI;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create WAV file");

    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let amplitude = 0.5f32;

    for i in 0..num_samples {
        let t = i as f32 / sample_rate as f32;
        let sample = (2.0 * PI * frequency_hz * t).sin() * amplitude;
        let sample_i16 = (sample * 32767.0) as i16;
        writer.write_sample(sample_i16).expect("Failed to write sample");
    }

    writer.finalize().expect("Failed to finalize WAV");
}

/// Backend that copies the input into four identical stems and counts calls
struct CopyingSeparator {
    calls: AtomicUsize,
}

impl CopyingSeparator {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl Separator for CopyingSeparator {
    fn separate(&self, audio: &Path, output_root: &Path) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let base = audio
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "track".to_string());
        let dir = output_root.join(base);
        fs::create_dir_all(&dir)?;
        for stem in self.stems() {
            fs::copy(audio, dir.join(format!("{}.wav", stem)))?;
        }
        Ok(dir)
    }
}

fn settings_for(input: &Path, output: &Path) -> Settings {
    Settings {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        stems_dir: output.join("stems"),
        keep_byproducts: true,
        show_progress: false,
        worker_threads: 2,
        ..Settings::default()
    }
}

#[test]
fn test_pipeline_separates_every_discovered_file() {
    let music = TempDir::new().expect("tempdir");
    let out = TempDir::new().expect("tempdir");

    generate_sine_wav(&music.path().join("one.wav"), 440.0, 0.2, 22050);
    generate_sine_wav(&music.path().join("two.wav"), 220.0, 0.2, 22050);

    let separator = Arc::new(CopyingSeparator::new());
    let provider = pipeline::provider_from_separator(separator.clone());

    let settings = settings_for(music.path(), out.path());
    let result = pipeline::run(&settings, provider).expect("pipeline");

    assert_eq!(result.total_files, 2);
    assert_eq!(result.successful, 2);
    assert_eq!(result.failed, 0);
    assert_eq!(separator.calls.load(Ordering::SeqCst), 2);

    for track in ["one", "two"] {
        let stems = out.path().join("stems").join("custom").join(track);
        for stem in ["drums", "bass", "other", "vocals"] {
            assert!(
                stems.join(format!("{}.wav", stem)).is_file(),
                "missing {}/{}.wav",
                track,
                stem
            );
        }
    }
}

#[test]
fn test_second_run_is_served_from_cache() {
    let music = TempDir::new().expect("tempdir");
    let out = TempDir::new().expect("tempdir");
    generate_sine_wav(&music.path().join("track.wav"), 330.0, 0.2, 22050);

    let separator = Arc::new(CopyingSeparator::new());
    let settings = settings_for(music.path(), out.path());

    let first = pipeline::run(
        &settings,
        pipeline::provider_from_separator(separator.clone()),
    )
    .expect("first run");
    let second = pipeline::run(
        &settings,
        pipeline::provider_from_separator(separator.clone()),
    )
    .expect("second run");

    assert_eq!(first.successful, 1);
    assert_eq!(second.successful, 1);
    // the cache served the second run
    assert_eq!(separator.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_partial_cache_entry_triggers_one_rerun() {
    let music = TempDir::new().expect("tempdir");
    let out = TempDir::new().expect("tempdir");
    generate_sine_wav(&music.path().join("track.wav"), 330.0, 0.2, 22050);

    // plant a cache entry with only one stem
    let entry = out.path().join("stems").join("custom").join("track");
    fs::create_dir_all(&entry).expect("create");
    fs::write(entry.join("drums.wav"), b"RIFF").expect("write");

    let separator = Arc::new(CopyingSeparator::new());
    let settings = settings_for(music.path(), out.path());
    let result = pipeline::run(&settings, pipeline::provider_from_separator(separator.clone()))
        .expect("pipeline");

    assert_eq!(result.successful, 1);
    assert_eq!(separator.calls.load(Ordering::SeqCst), 1);
    assert!(entry.join("vocals.wav").is_file());
}

#[test]
fn test_byproducts_are_removed_after_the_report() {
    let music = TempDir::new().expect("tempdir");
    let out = TempDir::new().expect("tempdir");
    generate_sine_wav(&music.path().join("track.wav"), 330.0, 0.2, 22050);

    let mut settings = settings_for(music.path(), out.path());
    settings.keep_byproducts = false;

    let result = pipeline::run(
        &settings,
        pipeline::provider_from_separator(Arc::new(CopyingSeparator::new())),
    )
    .expect("pipeline");

    assert_eq!(result.successful, 1);
    assert!(out.path().join("stemprep.json").is_file());
    assert!(!out.path().join("stems").join("custom").join("track").exists());
}

#[test]
fn test_report_lists_every_track_and_stem() {
    let music = TempDir::new().expect("tempdir");
    let out = TempDir::new().expect("tempdir");
    generate_sine_wav(&music.path().join("track.wav"), 330.0, 0.2, 22050);

    let settings = settings_for(music.path(), out.path());
    pipeline::run(
        &settings,
        pipeline::provider_from_separator(Arc::new(CopyingSeparator::new())),
    )
    .expect("pipeline");

    let text = fs::read_to_string(out.path().join("stemprep.json")).expect("read report");
    let report: serde_json::Value = serde_json::from_str(&text).expect("parse report");

    assert_eq!(report["version"], "1.0");
    assert_eq!(report["metadata"]["model"], "custom");
    assert_eq!(report["metadata"]["track_count"], 1);

    let tracks = report["tracks"].as_array().expect("tracks array");
    assert_eq!(tracks.len(), 1);
    let stems = tracks[0]["stems"].as_object().expect("stems object");
    for stem in ["drums", "bass", "other", "vocals"] {
        assert!(stems.contains_key(stem), "report missing stem {}", stem);
    }
    assert_eq!(tracks[0]["retained"], true);
}

#[test]
fn test_precomputed_mapping_drives_the_pipeline() {
    let music = TempDir::new().expect("tempdir");
    let precomputed = TempDir::new().expect("tempdir");
    let out = TempDir::new().expect("tempdir");

    let mapped = music.path().join("mapped.wav");
    let unmapped = music.path().join("unmapped.wav");
    generate_sine_wav(&mapped, 440.0, 0.2, 22050);
    generate_sine_wav(&unmapped, 220.0, 0.2, 22050);

    // out-of-band stems for the mapped track only
    let stems_dir = precomputed.path().join("mapped");
    fs::create_dir_all(&stems_dir).expect("create");
    for stem in ["drums", "bass", "other", "vocals"] {
        fs::copy(&mapped, stems_dir.join(format!("{}.wav", stem))).expect("copy");
    }

    let mut mapping = BTreeMap::new();
    mapping.insert(mapped.to_string_lossy().to_string(), stems_dir.clone());
    let provider: Arc<dyn stemprep::StemProvider> = Arc::new(PrecomputedStemProvider::new(
        mapping,
        stemprep::types::default_sources(),
    ));

    let mut settings = settings_for(music.path(), out.path());
    settings.keep_byproducts = false;

    let result = pipeline::run(&settings, provider).expect("pipeline");

    // the unmapped file is a recoverable skip, not a failure
    assert_eq!(result.total_files, 2);
    assert_eq!(result.successful, 1);
    assert_eq!(result.skipped, 1);
    assert_eq!(result.failed, 0);

    // out-of-band stems survive cleanup
    assert!(stems_dir.join("vocals.wav").is_file());
}

#[test]
fn test_unknown_model_reports_listing_and_suggestion() {
    let err = stemprep::get_model("htdemux", None).unwrap_err();
    match &err {
        StemprepError::ModelNotFound { suggestions, .. } => {
            assert!(suggestions.contains(&"htdemucs".to_string()));
        }
        other => panic!("expected ModelNotFound, got {:?}", other),
    }

    let message = err.to_string();
    assert!(message.contains("Available models"));
    assert!(message.contains("Did you mean"));
    assert!(message.contains("htdemucs"));
}

#[test]
fn test_list_models_includes_bundled_bags_and_signatures() {
    let names = stemprep::list_models(None).expect("list");
    for expected in ["htdemucs", "htdemucs_ft", "htdemucs_6s", "mdx", "955717e8"] {
        assert!(
            names.contains(&expected.to_string()),
            "missing {} in model listing",
            expected
        );
    }
}

#[test]
fn test_single_unsupported_file_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("notes.txt");
    fs::write(&path, b"not audio").expect("write");

    let settings = settings_for(&path, dir.path());
    let err = pipeline::run(
        &settings,
        pipeline::provider_from_separator(Arc::new(CopyingSeparator::new())),
    )
    .unwrap_err();
    assert!(matches!(err, StemprepError::UnsupportedFormat { .. }));
}
