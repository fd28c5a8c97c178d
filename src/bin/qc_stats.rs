//! Seqcos QC Stats Tool
//!
//! Base composition, GC content and quality statistics for FASTQ/FASTA
//! files, written as a JSON report for plotting.

use anyhow::Result;
use clap::{Arg, Command};
use seqcos_qc_tools::cli::{self, arg};
use seqcos_qc_tools::{
    sample_name, Analyzer, CancellationToken, InputStatistics, QcReport, QualityEncoding,
    QualityScoreAnalyzer, RunControl, SequenceAnalyzer, SequenceFile,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

fn main() -> Result<()> {
    let matches = Command::new("seqcos-qc")
        .version("0.1.0")
        .about("Sequence and quality statistics for FASTQ/FASTA reads")
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
                .value_name("JSON")
                .help("Output JSON report")
                .default_value("qc_report.json"),
        )
        .arg(cli::encoding_arg())
        .arg(cli::threads_arg())
        .arg(cli::verbose_arg())
        .get_matches();

    // Parse arguments
    let input_file = PathBuf::from(arg::<String>(&matches, "input")?);
    let output_file = PathBuf::from(arg::<String>(&matches, "output")?);
    let encoding: QualityEncoding = arg::<String>(&matches, "encoding")?.parse()?;
    let verbose = matches.get_flag("verbose");

    cli::init_logging(verbose);
    cli::configure_threads(arg(&matches, "threads")?)?;

    // Validate input file exists
    if !input_file.exists() {
        anyhow::bail!("Input file does not exist: {}", input_file.display());
    }
    let file = SequenceFile::detect(&input_file)?;
    let label = sample_name(&input_file);

    println!("🧬 Seqcos QC Stats");
    println!("Input: {} ({})", input_file.display(), file.format.name());
    println!("Output: {}", output_file.display());
    if file.format.has_quality() {
        println!("Quality encoding: {}", encoding);
    }

    let control = RunControl::new(CancellationToken::new())
        .with_progress(1_000_000, Arc::new(|done: u64| debug!("Processed {} reads", done)));

    println!("📊 Analyzing sequence content...");
    let mut sequence = SequenceAnalyzer::new(file.clone(), label.as_str())?;
    sequence.process(&control)?;
    let gc_by_position = sequence.gc_by_position(&control)?;

    let mut quality = if file.format.has_quality() {
        println!("⭐ Analyzing quality scores...");
        let mut analyzer = QualityScoreAnalyzer::with_dimensions(
            file.clone(),
            label.as_str(),
            encoding,
            sequence.read_count(),
            sequence.max_read_length(),
        )?;
        analyzer.process(&control)?;
        Some(analyzer)
    } else {
        None
    };

    let statistics = InputStatistics::from_analyzers(&sequence, quality.as_ref())?;
    let boxplot = match quality.as_mut() {
        Some(analyzer) => Some(analyzer.boxplot(&control)?),
        None => None,
    };
    let quality_by_read = quality
        .as_ref()
        .map(|analyzer| analyzer.mean_by_sequence().to_vec())
        .unwrap_or_default();

    // Output results
    println!("✅ QC analysis complete!");
    println!("📈 Sample: {}", statistics.sample_name);
    println!("📚 Total reads: {}", statistics.read_count);
    println!(
        "📏 Read length: {}-{} (mean {:.1})",
        statistics.read_length.min, statistics.read_length.max, statistics.read_length.mean
    );
    println!(
        "🔬 GC content: {:.2}% ± {:.2} (min {:.2}, max {:.2})",
        statistics.gc_by_read.mean,
        statistics.gc_by_read.std_dev,
        statistics.gc_by_read.min,
        statistics.gc_by_read.max
    );
    if let Some(base) = &statistics.base_quality {
        println!("⭐ Base quality: {}-{} (mean {:.2})", base.min, base.max, base.mean);
    }
    if let Some(reads) = &statistics.read_quality {
        println!("🎯 Read mean quality: {:.2} ± {:.2}", reads.mean, reads.std_dev);
    }

    let report = QcReport::new(
        statistics,
        gc_by_position,
        sequence.gc_by_sequence(),
        sequence.symbol_table(),
        &quality_by_read,
        boxplot,
    );
    report.export_json(&output_file)?;
    println!("💾 Results saved to: {}", output_file.display());

    Ok(())
}
