//! CLI argument parsing and configuration

use clap::Parser;
use std::path::PathBuf;

/// stemprep - Batch stem separation with pretrained models
///
/// Separates audio files into per-stem WAVs using pretrained models, a
/// local model repository, or a precomputed stems mapping. Results are
/// cached so each track is separated at most once.
#[derive(Parser, Debug)]
#[command(name = "stemprep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Input path (file or directory)
    #[arg(short, long, value_name = "PATH", required_unless_present = "list_models")]
    pub input: Option<PathBuf>,

    /// Output directory for stems and the run report
    #[arg(short, long, value_name = "DIR", required_unless_present = "list_models")]
    pub output: Option<PathBuf>,

    /// Pretrained model or bag name
    #[arg(short = 'n', long, value_name = "NAME", default_value = "htdemucs")]
    #[arg(conflicts_with = "sig")]
    pub name: String,

    /// Resolve a bare model signature instead of a name
    #[arg(short = 's', long, value_name = "SIG")]
    pub sig: Option<String>,

    /// Local model repository (directory of *.th/*.onnx files and bag JSON)
    #[arg(long, value_name = "DIR")]
    pub repo: Option<PathBuf>,

    /// Precomputed stems mapping file (audio path -> stems directory)
    #[arg(long, value_name = "FILE")]
    pub stems_dict: Option<PathBuf>,

    /// Directory to cache separated stems (defaults to output/stems)
    #[arg(long, value_name = "DIR")]
    pub stems_dir: Option<PathBuf>,

    /// Keep cached stems after the run instead of cleaning them up
    #[arg(long, default_value = "false")]
    pub keep_byproducts: bool,

    /// Inference device
    #[arg(long, value_name = "DEVICE", default_value = "auto")]
    #[arg(value_parser = ["auto", "cpu", "coreml", "directml"])]
    pub device: String,

    /// List all resolvable model names and exit
    #[arg(long, default_value = "false")]
    pub list_models: bool,

    /// Number of worker threads (defaults to CPU count - 1)
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Scan subdirectories recursively
    #[arg(short, long, default_value = "true")]
    pub recursive: bool,

    /// Re-separate even when cached stems exist
    #[arg(long, default_value = "false")]
    pub force: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress progress bars)
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

impl Cli {
    /// Get the effective stems cache directory
    pub fn effective_stems_dir(&self) -> PathBuf {
        match (&self.stems_dir, &self.output) {
            (Some(dir), _) => dir.clone(),
            (None, Some(output)) => output.join("stems"),
            (None, None) => PathBuf::from("stems"),
        }
    }

    /// The model identifier to resolve: an explicit signature wins
    pub fn model(&self) -> &str {
        self.sig.as_deref().unwrap_or(&self.name)
    }

    /// Get the log level based on verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_maps_to_log_level() {
        let base = ["stemprep", "-i", "in", "-o", "out"];
        let cases = [
            (0, tracing::Level::WARN),
            (1, tracing::Level::INFO),
            (2, tracing::Level::DEBUG),
            (3, tracing::Level::TRACE),
        ];
        for (count, expected) in cases {
            let mut args: Vec<&str> = base.to_vec();
            for _ in 0..count {
                args.push("-v");
            }
            let cli = Cli::parse_from(args);
            assert_eq!(cli.log_level(), expected, "-v x{}", count);
        }
    }

    #[test]
    fn test_list_models_needs_no_input_or_output() {
        let cli = Cli::parse_from(["stemprep", "--list-models"]);
        assert!(cli.list_models);
        assert!(cli.input.is_none());
    }
}
