//! stemprep CLI entry point

use clap::Parser;
use std::process::ExitCode;
use stemprep::config::{Cli, Settings};
use stemprep::{pipeline, repo};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(&cli);

    if cli.list_models {
        return list_models(&cli);
    }

    let settings = match Settings::from_cli(&cli) {
        Some(settings) => settings,
        None => {
            eprintln!("Error: --input and --output are required");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = validate_inputs(&settings) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let provider = match pipeline::provider_from_settings(&settings) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match pipeline::run(&settings, provider) {
        Ok(result) => {
            println!();
            println!(
                "Summary: {} successful, {} failed, {} skipped (of {} total)",
                result.successful, result.failed, result.skipped, result.total_files
            );

            if result.failed > 0 {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn list_models(cli: &Cli) -> ExitCode {
    match repo::list_models(cli.repo.as_deref()) {
        Ok(names) => {
            for name in names {
                println!("{}", name);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let filter = if cli.quiet {
        "error".to_string()
    } else {
        cli.log_level().to_string().to_lowercase()
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

fn validate_inputs(settings: &Settings) -> Result<(), String> {
    if !settings.input.exists() {
        return Err(format!(
            "Input path does not exist: {}\n\n  Tip: Check the path is correct and accessible.\n  Examples:\n    stemprep -i ~/Music -o ./separated\n    stemprep -i ./track.wav -o ./output",
            settings.input.display()
        ));
    }

    if let Some(parent) = settings.output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(format!(
                "Output parent directory does not exist: {}\n\n  Tip: The output directory will be created automatically,\n  but its parent directory must exist.\n  Example: mkdir -p {}",
                parent.display(),
                parent.display()
            ));
        }
    }

    if let Some(repo) = &settings.local_repo {
        if !repo.is_dir() {
            return Err(format!(
                "Model repository is not a directory: {}",
                repo.display()
            ));
        }
    }

    Ok(())
}
