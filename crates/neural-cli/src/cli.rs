//! CLI argument parsing and command definitions.

use clap::{Parser, Subcommand};

// ============================================================================
// CLI argument types
// ============================================================================

/// Rewrite neural queries into k-NN vector queries.
#[derive(Parser, Debug)]
#[command(name = "neural", author, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file.
    #[arg(short, long, env = "NEURAL_CONFIG")]
    pub config: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve every neural query in a JSON query document.
    Rewrite {
        /// Query file, or `-` for stdin.
        #[arg(default_value = "-")]
        file: String,

        /// Embed with a local deterministic model instead of the service.
        #[arg(long)]
        offline: bool,

        /// Embedding dimension used with `--offline`.
        #[arg(long, default_value = "384", requires = "offline")]
        dimension: usize,

        /// Print compact JSON.
        #[arg(long)]
        compact: bool,
    },

    /// Encode a JSON query document to its base64 wire form.
    Encode {
        /// Query file, or `-` for stdin.
        #[arg(default_value = "-")]
        file: String,
    },

    /// Decode a base64 wire form back to JSON.
    Decode {
        /// Base64 encoded query.
        input: String,
    },

    /// Print version information.
    Version,

    /// Configuration operations.
    Config(ConfigCommand),
}

/// Config-specific subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    /// Config subcommand to execute.
    #[command(subcommand)]
    pub command: ConfigAction,
}

/// Available config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path.
    Path,

    /// Get a configuration value by dotted key.
    Get {
        /// Dotted key (e.g., "inference.endpoint").
        key: String,
    },

    /// Set a configuration value by dotted key.
    Set {
        /// Dotted key (e.g., "rewrite.max_rounds").
        key: String,

        /// Value to set.
        value: String,
    },

    /// Create a default configuration file.
    Init {
        /// Output file path (defaults to XDG config path).
        #[arg(short, long)]
        file: Option<String>,

        /// Overwrite existing file.
        #[arg(long)]
        force: bool,
    },

    /// Export configuration as environment variables.
    Export {
        /// Format as Docker --env flags.
        #[arg(long)]
        docker_env: bool,
    },
}

// ============================================================================
// Tests
// ============================================================================
