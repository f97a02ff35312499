// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for every command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

const QUICKSTART_HELP: &str = "\
Get started:
  rollcall health              Check the backend is reachable
  rollcall status              Show today's course summary
  rollcall recent -n 20        List the 20 most recent sign-ins
  rollcall watch               Follow sign-ins live (Ctrl-C to stop)";

#[derive(Parser, Debug)]
#[command(name = "rollcall")]
#[command(version)]
#[command(about = "Live attendance feed client for the face-recognition sign-in system")]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    /// Config file (default: <config dir>/rollcall/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Follow the live feed until interrupted
    Watch {
        #[arg(long, short = 'o', value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Show the current course summary
    Status {
        #[arg(long, short = 'o', value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// List the most recent sign-ins
    Recent {
        /// Number of rows (default: recent_limit from config)
        #[arg(long, short = 'n', allow_negative_numbers = true)]
        limit: Option<i64>,

        #[arg(long, short = 'o', value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Check backend health
    Health {
        #[arg(long, short = 'o', value_enum, default_value_t)]
        output: OutputFormat,
    },
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
