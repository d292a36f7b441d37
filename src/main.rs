// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Demo driver: one writer, several logging readers, one of which loses
//! interest after a few chunks, and a first reader closed by the fanout.

use clap::{Arg, ArgMatches, Command};
use fanout_config::FanoutSpec;
use fanout_engine::{Branch, Fanout, pipe_with_policies};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// How long the read loop may take to notice the end of the pipe.
const SETTLE: Duration = Duration::from_millis(200);

/// Parsed demo arguments.
#[derive(Debug, Clone)]
struct DemoArgs {
    /// Optional YAML fanout declaration.
    config: Option<PathBuf>,
    /// Number of readers attached before the first write.
    branches: usize,
    /// Number of chunks written through the pipe.
    chunks: usize,
    /// Reads after which the last reader cancels (0 keeps it reading).
    lose_interest_after: usize,
    /// Default tracing filter when `RUST_LOG` is unset.
    log_level: String,
}

fn base_command() -> Command {
    Command::new("stream-fanout")
        .about("Duplicates one written stream to several independent readers")
        .arg(Arg::new("config")
            .short('c')
            .long("config")
            .num_args(1)
            .help("Path to a YAML fanout declaration"))
        .arg(Arg::new("branches")
            .long("branches")
            .num_args(1)
            .value_parser(clap::value_parser!(usize))
            .default_value("3")
            .help("Number of readers attached before the first write"))
        .arg(Arg::new("chunks")
            .long("chunks")
            .num_args(1)
            .value_parser(clap::value_parser!(usize))
            .default_value("4")
            .help("Number of chunks written through the pipe"))
        .arg(Arg::new("lose-interest-after")
            .long("lose-interest-after")
            .num_args(1)
            .value_parser(clap::value_parser!(usize))
            .default_value("2")
            .help("Reads after which the last reader cancels its branch (0 = never)"))
        .arg(Arg::new("log-level")
            .long("log-level")
            .num_args(1)
            .default_value("info")
            .help("Tracing filter used when RUST_LOG is not set"))
        .after_help("Examples:\n  stream-fanout --branches 3 --chunks 4\n  stream-fanout -c configs/fanout.yaml --log-level debug")
}

fn parse_demo_args(m: &ArgMatches) -> DemoArgs {
    DemoArgs {
        config: m.get_one::<String>("config").map(PathBuf::from),
        branches: m.get_one::<usize>("branches").copied().unwrap_or(3),
        chunks: m.get_one::<usize>("chunks").copied().unwrap_or(4),
        lose_interest_after: m.get_one::<usize>("lose-interest-after").copied().unwrap_or(2),
        log_level: m
            .get_one::<String>("log-level")
            .cloned()
            .unwrap_or_else(|| "info".to_owned()),
    }
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

async fn log_reads(name: String, mut branch: Branch<String>, limit: Option<usize>) {
    let mut read = 0usize;
    loop {
        if limit.is_some_and(|limit| read >= limit) {
            branch.cancel(format!("{name} lost interest"));
            break;
        }
        match branch.recv().await {
            Ok(chunk) => {
                read += 1;
                tracing::info!(reader = %name, %chunk, "read");
            }
            Err(err) => {
                tracing::info!(reader = %name, reason = err.as_label(), "branch ended");
                break;
            }
        }
    }
    tracing::info!(reader = %name, read, "reading done");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_demo_args(&base_command().get_matches());
    init_tracing(&args.log_level);

    let spec = match &args.config {
        Some(path) => FanoutSpec::from_file(path)?,
        None => FanoutSpec::default(),
    };
    let (writer, reader) = pipe_with_policies::<String>(&spec.policies)?;
    let fanout = Arc::new(Fanout::with_policies(reader, spec.policies));
    let mut run = tokio::spawn({
        let fanout = Arc::clone(&fanout);
        async move { fanout.start().await }
    });

    let mut first = None;
    let mut readers = Vec::with_capacity(args.branches);
    for index in 0..args.branches {
        let branch = fanout.add();
        _ = first.get_or_insert(branch.id());
        let limit = (index + 1 == args.branches && args.lose_interest_after > 0)
            .then_some(args.lose_interest_after);
        readers.push(tokio::spawn(log_reads(format!("r{}", index + 1), branch, limit)));
    }
    tracing::info!(size = fanout.size(), "fanout branches");

    for n in 1..=args.chunks {
        writer.write(format!("{{a: {n}}}")).await?;
        if n == 1 {
            if let Some(id) = first {
                _ = fanout.close(id);
            }
        }
        tracing::info!(size = fanout.size(), "fanout branches");
        _ = fanout.snapshot();
    }
    drop(writer);

    match tokio::time::timeout(SETTLE, &mut run).await {
        Ok(joined) => joined??,
        Err(_) => {
            tracing::info!("read loop parked without demand; stopping it");
            run.abort();
        }
    }

    let closed = fanout.close_all();
    for reader in readers {
        reader.await?;
    }
    let stats = fanout.stats();
    tracing::info!(
        closed,
        chunks_pulled = stats.chunks_pulled,
        branches_added = stats.branches_added,
        branches_closed = stats.branches_closed,
        branches_pruned = stats.branches_pruned,
        "demo finished"
    );
    Ok(())
}
