use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use nix::unistd::unlink;

use cammini::actors::VertexStore;
use cammini::signal_coordinator::{self, Flags};
use cammini::{dispatcher, graph_loader};

/// Computes shortest collaboration paths over an actor co-starring graph,
/// serving queries delivered over a named pipe.
#[derive(Parser, Debug)]
#[command(name = "cammini", version, about)]
struct Args {
    /// Tab-separated `code\tname\tyear` vertex file, pre-sorted by code.
    names_file: PathBuf,

    /// Tab-separated `code\tk\tn1..nk` adjacency file.
    graph_file: PathBuf,

    /// Number of graph-loader consumer threads.
    #[arg(value_parser = parse_worker_count)]
    workers: usize,
}

/// Reproduces the original CLI's acceptance rule: an optional leading `+`
/// followed by one or more ASCII digits. No other sign, no empty string,
/// no surrounding whitespace. This is intentionally stricter than relaxing
/// to "any valid usize" and looser than `str::parse` alone (which rejects
/// the leading `+`).
fn parse_worker_count(raw: &str) -> Result<usize, String> {
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("'{raw}' is not a valid worker count"));
    }
    digits
        .parse()
        .map_err(|_| format!("'{raw}' overflows a worker count"))
}

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let flags = Flags::new();
    let _signal_thread = signal_coordinator::spawn(Arc::clone(&flags))
        .context("failed to install SIGINT handler")?;

    log::info!("building vertex store from {}", args.names_file.display());
    let store = VertexStore::load(&args.names_file)
        .map_err(anyhow::Error::from)
        .context("loading names file")?;

    log::info!(
        "loading graph from {} with {} workers",
        args.graph_file.display(),
        args.workers
    );
    graph_loader::load(&args.graph_file, args.workers, &store)
        .map_err(anyhow::Error::from)
        .context("loading graph file")?;

    flags.mark_graph_finished();
    log::info!("graph build complete, serving queries");

    let store = Arc::new(store);
    let pipe_path = dispatcher::default_pipe_path();
    let result = dispatcher::run(&pipe_path, Arc::clone(&store), Arc::clone(&flags));

    if let Err(e) = unlink(&pipe_path) {
        log::warn!("failed to unlink {}: {e}", pipe_path.display());
    }

    result.map_err(anyhow::Error::from).context("serving queries")?;
    Ok(())
}
