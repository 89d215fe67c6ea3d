//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Use this config file
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// modsync - Synchronize module repositories into a local module store
#[derive(Parser, Debug)]
#[command(name = "modsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Use this config file instead of the standard locations
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true, conflicts_with = "debug")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Synchronize every configured repository channel
    #[command(
        name = "sync",
        long_about = "Synchronize every configured repository channel.\n\n\
            Repositories from the config file are registered in the store, then each \
            channel's remote head is compared with the stored revision. New revisions \
            are downloaded, unpacked, decoded and validated before the module is stored. \
            A failing channel is reported without stopping the others.\n\n\
            Each invocation is a new process with its own job cache, so job ids \
            are not deduplicated across runs. Channels whose revision did not \
            change are skipped either way.",
        after_help = "\
EXAMPLES:
    # Sync with a generated job id
    modsync sync

    # Tag the run with a deployment and job id for the logs
    modsync sync --deployment edge-42 --job 7f1c"
    )]
    Sync {
        /// Deployment the sync runs for
        #[arg(long, value_name = "ID", default_value = "local")]
        deployment: String,

        /// Job id recorded in the logs; a random one is generated if omitted
        #[arg(long, value_name = "ID")]
        job: Option<String>,
    },

    /// List repositories and their channel heads
    Repos,

    /// List stored modules
    Modules {
        /// Only modules from this repository source
        #[arg(long, value_name = "SOURCE")]
        source: Option<String>,
    },

    /// Decode and validate the manifest of a local module tree
    Validate {
        /// Module root containing Modfile.yml or Modfile.yaml
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },

    /// Regenerate a local module's manifest in another schema version
    #[command(after_help = "\
EXAMPLES:
    # Print the manifest in schema v2
    modsync generate ./my-module --schema v2

    # Write it to a file
    modsync generate ./my-module --schema v2 --output Modfile.v2.yml")]
    Generate {
        /// Module root containing Modfile.yml or Modfile.yaml
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Target schema version (e.g. v1, v2)
        #[arg(long, value_name = "VERSION")]
        schema: String,

        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}
