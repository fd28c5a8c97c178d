//! Helpers shared by the command-line tools

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches};

/// Install the tracing subscriber; `RUST_LOG` overrides the level
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_level))
        .init();
}

/// Size the global rayon pool; 0 keeps one thread per core
pub fn configure_threads(threads: usize) -> Result<()> {
    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }
    Ok(())
}

/// Fetch a parsed argument that clap guarantees through `required` or a default
pub fn arg<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, name: &str) -> Result<T> {
    matches
        .get_one::<T>(name)
        .cloned()
        .with_context(|| format!("Missing argument: {}", name))
}

/// `--threads` option
pub fn threads_arg() -> Arg {
    Arg::new("threads")
        .short('t')
        .long("threads")
        .value_name("N")
        .help("Worker threads (0 = all cores)")
        .value_parser(clap::value_parser!(usize))
        .default_value("0")
}

/// `--verbose` flag
pub fn verbose_arg() -> Arg {
    Arg::new("verbose")
        .short('v')
        .long("verbose")
        .help("Print debug logging and a detailed summary")
        .action(ArgAction::SetTrue)
}

/// `--encoding` option
pub fn encoding_arg() -> Arg {
    Arg::new("encoding")
        .short('e')
        .long("encoding")
        .value_name("SCHEME")
        .help("Quality encoding: sanger, solexa, illumina1.3, illumina1.5, illumina1.8")
        .default_value("sanger")
}
