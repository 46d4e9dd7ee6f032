//! Command dispatch for the `neural` binary.

use neural_core::Result;
use tracing_subscriber::EnvFilter;

use crate::cli::{CliArgs, Command};
use crate::config::NeuralConfig;
use crate::config_handlers;
use crate::query_handlers::{self, RewriteOptions};

/// Initialise tracing-based logging.
///
/// Uses `RUST_LOG` env var if set, otherwise defaults based on verbosity flags.
pub fn init_logging(verbose: bool, quiet: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if quiet {
        EnvFilter::new("warn")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Ignore error if a subscriber is already set (e.g. in tests).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run the CLI with the given arguments.
pub async fn run(args: CliArgs) -> Result<()> {
    init_logging(args.verbose, args.quiet);
    tracing::debug!(command = ?args.command, "Starting neural");

    match args.command {
        Some(Command::Rewrite {
            file,
            offline,
            dimension,
            compact,
        }) => {
            let config = NeuralConfig::load(args.config.as_deref())?;
            let options = RewriteOptions {
                file,
                offline: offline.then_some(dimension),
                compact,
            };
            query_handlers::handle_rewrite(&config, options).await
        }
        Some(Command::Encode { file }) => query_handlers::handle_encode(&file).await,
        Some(Command::Decode { input }) => query_handlers::handle_decode(&input),
        Some(Command::Version) => {
            println!("neural {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Command::Config(config_cmd)) => {
            config_handlers::handle_config_command(args.config.as_deref(), config_cmd.command)
        }
        None => {
            println!("neural {}, use --help for usage", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::Parser;

    #[tokio::test]
    async fn test_run_version_command() {
        let args = CliArgs::parse_from(["neural", "version"]);
        assert!(run(args).await.is_ok());
    }

    #[tokio::test]
    async fn test_run_no_command() {
        let args = CliArgs::parse_from(["neural", "--quiet"]);
        assert!(run(args).await.is_ok());
    }

    #[tokio::test]
    async fn test_run_decode_rejects_garbage() {
        let args = CliArgs::parse_from(["neural", "decode", "AAAA"]);
        assert!(run(args).await.is_err());
    }

    #[tokio::test]
    async fn test_run_rewrite_offline() {
        let dir = tempfile::TempDir::new().unwrap();
        let query = dir.path().join("query.json");
        std::fs::write(
            &query,
            r#"{"bool": {"must": [{"neural": {"doc": "a", "model_id": "m", "knn_vector_field": "f"}}]}}"#,
        )
        .unwrap();
        let missing_config = dir.path().join("config.toml");

        let args = CliArgs::parse_from([
            "neural",
            "--config",
            missing_config.to_str().unwrap(),
            "rewrite",
            query.to_str().unwrap(),
            "--offline",
            "--dimension",
            "3",
        ]);
        assert!(run(args).await.is_ok());
    }

    #[tokio::test]
    async fn test_run_config_path() {
        let args = CliArgs::parse_from(["neural", "--config", "/tmp/neural.toml", "config", "path"]);
        assert!(run(args).await.is_ok());
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(false, false);
        init_logging(true, false);
        init_logging(false, true);
    }
}
