//! Seqcos Discard Tool
//!
//! Remove FASTQ/FASTA reads that are too short, too low in quality or
//! match a pattern.

use anyhow::Result;
use clap::{Arg, ArgGroup, Command};
use seqcos_qc_tools::cli::{self, arg};
use seqcos_qc_tools::{
    create_sink, export_stats, sample_name, validate_pattern, DiscardMode, DiscardSettings,
    QualityEncoding, RecordSink, RunControl, SequenceFile,
};
use std::path::PathBuf;

fn main() -> Result<()> {
    let matches = Command::new("seqcos-discard")
        .version("0.1.0")
        .about("Discard FASTQ/FASTA reads by length, mean quality or pattern")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("Input FASTQ or FASTA file (gzip supported)")
                .required(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output file for kept reads")
                .required(true),
        )
        .arg(
            Arg::new("length")
                .short('l')
                .long("length")
                .value_name("LENGTH")
                .help("Discard reads shorter than this")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("quality")
                .short('q')
                .long("mean-quality")
                .value_name("PHRED")
                .help("Discard reads whose mean quality is below this")
                .value_parser(clap::value_parser!(u8)),
        )
        .arg(
            Arg::new("regex")
                .short('r')
                .long("regex")
                .value_name("PATTERN")
                .help("Discard reads matching this pattern"),
        )
        .group(
            ArgGroup::new("mode")
                .args(["length", "quality", "regex"])
                .required(true),
        )
        .arg(
            Arg::new("discarded")
                .short('D')
                .long("discarded")
                .value_name("FILE")
                .help("Write discarded reads to this file"),
        )
        .arg(
            Arg::new("stats")
                .long("stats")
                .value_name("JSON")
                .help("Output statistics JSON file")
                .default_value("discard_stats.json"),
        )
        .arg(cli::encoding_arg())
        .arg(cli::threads_arg())
        .arg(cli::verbose_arg())
        .get_matches();

    // Parse arguments
    let input_file = PathBuf::from(arg::<String>(&matches, "input")?);
    let output_file = PathBuf::from(arg::<String>(&matches, "output")?);
    let discarded_file = matches.get_one::<String>("discarded").map(PathBuf::from);
    let stats_file = PathBuf::from(arg::<String>(&matches, "stats")?);
    let encoding: QualityEncoding = arg::<String>(&matches, "encoding")?.parse()?;
    let verbose = matches.get_flag("verbose");

    let mode = if let Some(&length) = matches.get_one::<usize>("length") {
        DiscardMode::Length(length)
    } else if let Some(&threshold) = matches.get_one::<u8>("quality") {
        DiscardMode::MeanQuality(threshold)
    } else {
        let pattern = arg::<String>(&matches, "regex")?;
        validate_pattern(&pattern)?;
        DiscardMode::Regex(pattern)
    };
    let settings = DiscardSettings { mode, encoding };

    cli::init_logging(verbose);
    cli::configure_threads(arg(&matches, "threads")?)?;

    if !input_file.exists() {
        anyhow::bail!("Input file does not exist: {}", input_file.display());
    }
    let input = SequenceFile::detect(&input_file)?;
    let discarder = settings.build()?;
    if discarder.strategy().requires_quality() && !input.format.has_quality() {
        anyhow::bail!(
            "Mean quality filtering needs quality scores, but {} is {}",
            input_file.display(),
            input.format.name()
        );
    }

    println!("🎯 Seqcos Read Discarder");
    println!("Input: {} ({})", input_file.display(), input.format.name());
    println!("Output: {}", output_file.display());
    println!("Mode: {}", discarder.strategy().name());

    let sample = sample_name(&input_file);
    let mut filtered = create_sink(&output_file, input.format)?;
    let mut discarded: Option<Box<dyn RecordSink>> = match &discarded_file {
        Some(path) => Some(create_sink(path, input.format)?),
        None => None,
    };

    let stats = discarder.discard_reads(
        &input,
        filtered.as_mut(),
        discarded.as_deref_mut().map(|sink| sink as &mut dyn RecordSink),
        &RunControl::default(),
        &sample,
    )?;

    // Output statistics
    println!("📊 Discard Results:");
    println!("  Total reads: {}", stats.total_reads);
    println!("  Reads passed: {} ({:.1}%)", stats.reads_passed, stats.pass_rate);
    println!("  Reads discarded: {}", stats.reads_discarded);
    if verbose {
        println!("  Discarded {}/{}", stats.reads_discarded, stats.total_reads);
        println!("  Settings: {}", serde_json::to_string(&settings)?);
    }
    if let Some(path) = &discarded_file {
        println!("🗑️  Discarded reads written to: {}", path.display());
    }

    export_stats(&stats, &stats_file)?;
    println!("💾 Statistics saved to: {}", stats_file.display());

    Ok(())
}
