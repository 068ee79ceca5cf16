//! CLI command definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use flightdeck_store::Pressed;

/// Flightdeck - declarative airplane control loops
#[derive(Parser, Debug)]
#[command(name = "flightdeck")]
#[command(version)]
#[command(about = "Keeps an airplane's pedals and rudder converged with its controls")]
#[command(
    long_about = "Flightdeck runs three cooperating control loops against an in-memory object store: \
the airplane loop creates and links the pedals and rudder, the pedal linkage loop turns a press into \
a linkage position and a rudder target, and the rudder loop moves the rudder to its target."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an airplane, then press the pedals and report each settled step
    Fly {
        /// Tail number (N-number, e.g. N123AB)
        #[arg(short, long)]
        tail_number: String,

        /// Namespace for the airplane and its parts
        #[arg(long, default_value = "default")]
        namespace: String,

        /// Airplane name (defaults to the lower-cased tail number)
        #[arg(long)]
        name: Option<String>,

        /// Pedal inputs to apply in order (none, left, right)
        #[arg(short, long = "press")]
        presses: Vec<Pressed>,

        /// Manager configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seconds to wait for each step to settle
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
    },

    /// Apply a manifest and run the loops until every airplane has converged
    Run {
        /// Manifest file (YAML or JSON)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Manager configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seconds to wait for convergence
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,

        /// Keep the loops running after convergence until Ctrl+C
        #[arg(short, long, default_value_t = false)]
        follow: bool,
    },

    /// Load and validate a manager configuration file
    CheckConfig {
        /// Manager configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[cfg(test)]
#[allow(clippy::unreachable)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_fly_parses_repeated_presses() {
        let cli = Cli::try_parse_from([
            "flightdeck",
            "fly",
            "--tail-number",
            "N123AB",
            "--press",
            "left",
            "-p",
            "right",
        ]);
        let Ok(Cli {
            command: Commands::Fly { presses, .. },
        }) = cli
        else {
            unreachable!("fly command parses");
        };
        assert_eq!(presses, vec![Pressed::Left, Pressed::Right]);
    }

    #[test]
    fn test_unknown_press_is_rejected() {
        let cli = Cli::try_parse_from([
            "flightdeck",
            "fly",
            "--tail-number",
            "N123AB",
            "--press",
            "up",
        ]);
        assert!(cli.is_err());
    }
}
