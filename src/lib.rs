//! stemprep - Batch Stem Separation with Pretrained Models
//!
//! A command-line utility and library for separating audio files into
//! per-stem WAVs. Models resolve by name against a bundled remote index,
//! an optional local repository, and named ensemble (bag) definitions;
//! results are cached so each track is separated at most once.
//!
//! # Architecture
//!
//! The library is organized into several key modules:
//!
//! - `config`: CLI argument parsing and runtime settings
//! - `discovery`: File scanning
//! - `audio`: WAV decoding and stem writing using hound
//! - `repo`: Model resolution, download, and loading (with bag support)
//! - `provider`: Swappable separation backends behind one trait
//! - `cache`: Separate-once stem caching with atomic promotion
//! - `pipeline`: Parallel processing orchestration
//! - `report`: JSON run report
//!
//! # Example
//!
//! ```no_run
//! use stemprep::{config::Settings, pipeline};
//!
//! let settings = Settings::default();
//! let provider = pipeline::provider_from_settings(&settings).expect("provider");
//! let result = pipeline::run(&settings, provider).expect("Separation failed");
//! println!("Separated {} tracks", result.successful);
//! ```

pub mod audio;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod pipeline;
pub mod provider;
pub mod report;
pub mod repo;
pub mod suggest;
pub mod types;

// Re-export key types at crate root
pub use cache::StemCache;
pub use error::{Result, StemprepError};
pub use provider::{Device, Separator, StemProvider};
pub use repo::{get_model, list_models, ResolvedModel, DEFAULT_MODEL};
pub use types::{StemsDirectory, StereoBuffer};
