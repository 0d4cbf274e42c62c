//! Runtime configuration settings

use std::path::PathBuf;

use crate::provider::Device;

/// Runtime settings for the separation pipeline
#[derive(Debug, Clone)]
pub struct Settings {
    /// Input path (file or directory)
    pub input: PathBuf,
    /// Output directory
    pub output: PathBuf,
    /// Model or signature to resolve
    pub model: String,
    /// Local model repository
    pub local_repo: Option<PathBuf>,
    /// Precomputed stems mapping file
    pub stems_dict: Option<PathBuf>,
    /// Stems cache directory
    pub stems_dir: PathBuf,
    /// Keep cached stems after the run
    pub keep_byproducts: bool,
    /// Inference device
    pub device: Device,
    /// Number of separation worker threads
    pub worker_threads: usize,
    /// Scan recursively
    pub recursive: bool,
    /// Re-separate even when cached stems exist
    pub force: bool,
    /// Show progress bars
    pub show_progress: bool,
}

impl Settings {
    /// Create settings from CLI arguments.
    ///
    /// Only valid for pipeline runs: `input` and `output` must be present
    /// (clap enforces this unless --list-models was given).
    pub fn from_cli(cli: &super::cli::Cli) -> Option<Self> {
        let input = cli.input.clone()?;
        let output = cli.output.clone()?;

        let default_threads = num_cpus::get().saturating_sub(1).max(1);
        let device = cli.device.parse().ok()?;

        Some(Self {
            input,
            stems_dir: cli.effective_stems_dir(),
            output,
            model: cli.model().to_string(),
            local_repo: cli.repo.clone(),
            stems_dict: cli.stems_dict.clone(),
            keep_byproducts: cli.keep_byproducts,
            device,
            worker_threads: cli.threads.unwrap_or(default_threads),
            recursive: cli.recursive,
            force: cli.force,
            show_progress: !cli.quiet,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: PathBuf::from("."),
            output: PathBuf::from("./output"),
            model: crate::repo::DEFAULT_MODEL.to_string(),
            local_repo: None,
            stems_dict: None,
            stems_dir: PathBuf::from("./output/stems"),
            keep_byproducts: false,
            device: Device::Auto,
            worker_threads: num_cpus::get().saturating_sub(1).max(1),
            recursive: true,
            force: false,
            show_progress: true,
        }
    }
}
