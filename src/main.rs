//! anatomy's main application entry point and orchestration logic.
//! Handles command-line argument parsing, feature registration and
//! playbook application.

use std::path::PathBuf;

use anatomy::{
    cli::{get_args, Args, Commands},
    config::{
        playbook_from_file, register_features_from_file, FEATURES_ENV_VAR, PLAYBOOK_FILE,
    },
    error::{default_error_handler, Error, Result},
    feature::FeatureRegistry,
};

fn main() {
    let args = get_args();

    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

/// Resolves the features file from the flag or the environment.
fn resolve_features_file(features_file: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = features_file {
        return Ok(path);
    }
    match std::env::var(FEATURES_ENV_VAR) {
        Ok(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Err(Error::ConfigError(format!(
            "no features file: pass --features-file or set {}",
            FEATURES_ENV_VAR
        ))),
    }
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Commands::Tree { features_file } => {
            let features_file = resolve_features_file(features_file)?;
            let mut registry = FeatureRegistry::new();
            register_features_from_file(&mut registry, &features_file)?;

            // Nested paths list before root-level ones; the feature column
            // is width-aligned.
            let items = registry.tree_sorted();
            let width = items.iter().map(|(feature, _, _)| feature.len()).max().unwrap_or(0);
            for (feature, _fileid, filename) in items {
                println!("{:width$}  {}", feature, filename, width = width);
            }
            Ok(())
        }
        Commands::Apply { directories, features_file } => {
            let features_file = resolve_features_file(features_file)?;
            let mut registry = FeatureRegistry::new();
            register_features_from_file(&mut registry, &features_file)?;

            let directories = if directories.is_empty() {
                vec![PathBuf::from(".")]
            } else {
                directories
            };

            for directory in directories {
                println!("{}", directory.display());
                let playbook = playbook_from_file(&registry, directory.join(PLAYBOOK_FILE))?;
                playbook.apply(&directory)?;
            }
            Ok(())
        }
    }
}
