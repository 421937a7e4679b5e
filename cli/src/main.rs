//! hxlink binary entry point.
//!
//! A single subcommand starts the language server on stdin/stdout:
//!
//! ```text
//! hxlink lsp [-d|--debug] [--stdio]
//! ```
//!
//! stdout carries the LSP transport, so logging never goes there: with
//! `--debug` it lands in `~/.hxlink/logs/hxlink.log`, otherwise tracing
//! stays uninstalled and silent.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use hxlink_lsp::config::ServerConfig;

#[derive(Parser)]
#[command(name = "hxlink", version, about = "Language server for hypermedia applications")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the language server on stdin/stdout.
    Lsp {
        /// Enable file-based debug logging into ~/.hxlink/logs/.
        #[arg(short, long)]
        debug: bool,
        /// Use stdio transport (the only transport; accepted for editors
        /// that pass it unconditionally).
        #[arg(long, default_value_t = true)]
        stdio: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Lsp { debug, stdio: _ } => run_lsp(debug),
    }
}

fn run_lsp(debug: bool) -> Result<()> {
    if debug {
        init_tracing();
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(hxlink_lsp::start(ServerConfig::load()))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("debug"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let Some((path, file)) = open_log_file() else {
        // No usable log file: prefer silence over corrupting the transport.
        return;
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(env_filter)
        .init();

    tracing::info!(path = %path.display(), "logging initialized");
}

fn open_log_file() -> Option<(PathBuf, fs::File)> {
    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent() {
            if fs::create_dir_all(parent).is_err() {
                continue;
            }
        }
        if let Ok(file) = OpenOptions::new().create(true).append(true).open(&candidate) {
            return Some((candidate, file));
        }
    }
    None
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".hxlink").join("logs").join("hxlink.log"));
    }
    // Fallback for constrained environments without a home directory.
    candidates.push(PathBuf::from(".hxlink").join("logs").join("hxlink.log"));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses_lsp_subcommand() {
        let cli = Cli::try_parse_from(["hxlink", "lsp"]).unwrap();
        let Command::Lsp { debug, stdio } = cli.command;
        assert!(!debug);
        assert!(stdio);
    }

    #[test]
    fn test_cli_parses_debug_flag() {
        let cli = Cli::try_parse_from(["hxlink", "lsp", "--debug"]).unwrap();
        let Command::Lsp { debug, .. } = cli.command;
        assert!(debug);
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["hxlink"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_candidates_end_with_log_file() {
        for candidate in log_file_candidates() {
            assert!(candidate.ends_with(PathBuf::from("logs").join("hxlink.log")));
        }
    }
}
