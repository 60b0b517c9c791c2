// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::orchestrator::{CallOptions, RunOptions};

/// Command-line arguments for `cmdrunner`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cmdrunner",
    version,
    about = "Run registered test, build and deploy commands and judge their output.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(
        long,
        value_name = "PATH",
        env = "CMDRUNNER_CONFIG",
        default_value = crate::config::DEFAULT_CONFIG_FILE
    )]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CMDRUNNER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a test registration.
    Run {
        #[command(flatten)]
        call: CallArgs,

        /// Persist the execution log to a file.
        #[arg(long)]
        write_to_file: bool,

        /// Log file path; defaults to `execution_<run id>.log`.
        #[arg(long, value_name = "PATH", requires = "write_to_file")]
        output_file: Option<PathBuf>,
    },

    /// Run a build registration and collect its artifacts.
    Build {
        #[command(flatten)]
        call: CallArgs,
    },

    /// Run a deploy registration and probe its health URL.
    Deploy {
        #[command(flatten)]
        call: CallArgs,
    },

    /// Run a deployment's stop command.
    Stop {
        /// Deploy registration id.
        id: String,

        #[arg(long, value_name = "ID")]
        session: Option<String>,
    },

    /// Print registrations without running anything.
    List,
}

/// Options shared by run/build/deploy.
#[derive(Debug, Clone, Args)]
pub struct CallArgs {
    /// Registration id.
    pub id: String,

    /// Arguments replacing the registration's default arguments.
    #[arg(long = "args", value_name = "ARGS", allow_hyphen_values = true)]
    pub arguments: Option<String>,

    /// Timeout in seconds replacing the registration's default.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<i64>,

    /// Session id recorded in history and used for report copies.
    #[arg(long, value_name = "ID")]
    pub session: Option<String>,
}

impl CallArgs {
    pub fn into_run_options(self, write_to_file: bool, output_file: Option<PathBuf>) -> RunOptions {
        RunOptions {
            call: self.into(),
            write_to_file,
            output_file_path: output_file,
        }
    }
}

impl From<CallArgs> for CallOptions {
    fn from(args: CallArgs) -> Self {
        CallOptions {
            registration_id: args.id,
            arguments: args.arguments,
            timeout_seconds: args.timeout,
            session_id: args.session,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
