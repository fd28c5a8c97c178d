//! Seqcos Trim Tool
//!
//! Trim FASTQ/FASTA reads by length, by quality window or by pattern.

use anyhow::Result;
use clap::{Arg, ArgAction, ArgGroup, Command};
use seqcos_qc_tools::cli::{self, arg};
use seqcos_qc_tools::{
    create_sink, export_stats, sample_name, validate_pattern, QualityEncoding, RecordSink,
    RunControl, SequenceFile, TrimMode, TrimSettings,
};
use std::path::PathBuf;

fn main() -> Result<()> {
    let matches = Command::new("seqcos-trim")
        .version("0.1.0")
        .about("Trim FASTQ/FASTA reads by length, quality or pattern")
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
                .help("Output file for trimmed reads")
                .required(true),
        )
        .arg(
            Arg::new("length")
                .short('l')
                .long("length")
                .value_name("LENGTH")
                .help("Bases to keep; a value in (0, 1) keeps that fraction of each read")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("quality")
                .short('q')
                .long("quality")
                .value_name("PHRED")
                .help("Keep the best window of bases scoring above this threshold")
                .value_parser(clap::value_parser!(u8)),
        )
        .arg(
            Arg::new("regex")
                .short('r')
                .long("regex")
                .value_name("PATTERN")
                .help("Cut every match of this pattern out of each read"),
        )
        .group(
            ArgGroup::new("mode")
                .args(["length", "quality", "regex"])
                .required(true),
        )
        .arg(
            Arg::new("from_start")
                .short('L')
                .long("from-start")
                .help("Trim from the start of reads as well as the end")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("min_length")
                .short('m')
                .long("min-length")
                .value_name("LENGTH")
                .help("Discard quality-trimmed reads shorter than this")
                .value_parser(clap::value_parser!(usize))
                .default_value("0"),
        )
        .arg(
            Arg::new("discarded")
                .short('D')
                .long("discarded")
                .value_name("FILE")
                .help("Write reads that could not be trimmed to this file"),
        )
        .arg(
            Arg::new("stats")
                .long("stats")
                .value_name("JSON")
                .help("Output statistics JSON file")
                .default_value("trim_stats.json"),
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

    let mode = if let Some(&length) = matches.get_one::<f64>("length") {
        TrimMode::Length(length)
    } else if let Some(&threshold) = matches.get_one::<u8>("quality") {
        TrimMode::Quality(threshold)
    } else {
        let pattern = arg::<String>(&matches, "regex")?;
        validate_pattern(&pattern)?;
        TrimMode::Regex(pattern)
    };
    let settings = TrimSettings {
        mode,
        from_start: matches.get_flag("from_start"),
        min_length: arg(&matches, "min_length")?,
        encoding,
    };

    cli::init_logging(verbose);
    cli::configure_threads(arg(&matches, "threads")?)?;

    if !input_file.exists() {
        anyhow::bail!("Input file does not exist: {}", input_file.display());
    }
    let input = SequenceFile::detect(&input_file)?;
    let trimmer = settings.build()?;
    if trimmer.strategy().requires_quality() && !input.format.has_quality() {
        anyhow::bail!(
            "Quality trimming needs quality scores, but {} is {}",
            input_file.display(),
            input.format.name()
        );
    }

    println!("✂️  Seqcos Read Trimmer");
    println!("Input: {} ({})", input_file.display(), input.format.name());
    println!("Output: {}", output_file.display());
    println!("Mode: {}", trimmer.strategy().name());
    println!("⚠️  Output order may differ from input order");

    let sample = sample_name(&input_file);
    let mut filtered = create_sink(&output_file, input.format)?;
    let mut discarded: Option<Box<dyn RecordSink>> = match &discarded_file {
        Some(path) => Some(create_sink(path, input.format)?),
        None => None,
    };

    let stats = trimmer.trim_all(
        &input,
        filtered.as_mut(),
        discarded.as_deref_mut().map(|sink| sink as &mut dyn RecordSink),
        &RunControl::default(),
        &sample,
    )?;

    // Output statistics
    println!("📊 Trimming Results:");
    println!("  Total reads: {}", stats.total_reads);
    println!("  Reads trimmed: {} ({:.1}%)", stats.reads_trimmed, stats.trim_rate);
    println!("  Reads discarded: {}", stats.reads_discarded);
    if verbose {
        println!("  Trimmed {}/{}", stats.reads_trimmed, stats.total_reads);
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
