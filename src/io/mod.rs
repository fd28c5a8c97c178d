//! Record sources and sinks
//!
//! The analyzers and filters never parse files themselves. They pull records
//! from a [`RecordSource`] and push results into a [`RecordSink`]. A source
//! can be iterated more than once; each call to [`RecordSource::records`]
//! re-opens the underlying data.

pub mod fasta;
pub mod fastq;

pub use fasta::{FastaReader, FastaWriter};
pub use fastq::{FastqReader, FastqWriter};

use crate::error::{QcError, Result};
use crate::record::SeqRecord;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Lazily produced records of one pass
pub type RecordIter = Box<dyn Iterator<Item = Result<SeqRecord>> + Send>;

/// Re-iterable supplier of reads
pub trait RecordSource: Sync {
    /// Start a fresh pass over the records, in input order
    fn records(&self) -> Result<RecordIter>;
}

/// Receiver of records, one write at a time
pub trait RecordSink: Send {
    fn write_record(&mut self, record: &SeqRecord) -> Result<()>;

    fn flush(&mut self) -> Result<()>;
}

impl RecordSink for Vec<SeqRecord> {
    fn write_record(&mut self, record: &SeqRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn write_record(&mut self, record: &SeqRecord) -> Result<()> {
        (**self).write_record(record)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// In-memory records; every pass clones them
impl RecordSource for Vec<SeqRecord> {
    fn records(&self) -> Result<RecordIter> {
        Ok(Box::new(self.clone().into_iter().map(Ok)))
    }
}

impl<T: RecordSource + ?Sized> RecordSource for &T {
    fn records(&self) -> Result<RecordIter> {
        (**self).records()
    }
}

/// Sequence file layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Fastq,
    Fasta,
}

impl FileFormat {
    /// Detect the format from the file extension, looking through `.gz`
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_ascii_lowercase())
            .ok_or_else(|| QcError::UnknownFormat(path.display().to_string()))?;
        let stem = name.strip_suffix(".gz").unwrap_or(&name);
        let extension = stem.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");

        match extension {
            "fastq" | "fq" => Ok(FileFormat::Fastq),
            "fasta" | "fa" | "fna" | "fas" => Ok(FileFormat::Fasta),
            _ => Err(QcError::UnknownFormat(path.display().to_string())),
        }
    }

    pub fn has_quality(self) -> bool {
        matches!(self, FileFormat::Fastq)
    }

    pub fn name(self) -> &'static str {
        match self {
            FileFormat::Fastq => "FASTQ",
            FileFormat::Fasta => "FASTA",
        }
    }
}

fn is_gzipped(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

/// Open a file for buffered reading, decompressing `.gz` transparently
pub fn open_reader<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead + Send>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    if is_gzipped(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn open_writer(path: &Path) -> Result<Box<dyn Write + Send>> {
    let file = File::create(path)?;
    if is_gzipped(path) {
        Ok(Box::new(BufWriter::new(GzEncoder::new(file, Compression::default()))))
    } else {
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// A FASTQ or FASTA file on disk, re-parsed on every pass
#[derive(Debug, Clone)]
pub struct SequenceFile {
    pub path: PathBuf,
    pub format: FileFormat,
}

impl SequenceFile {
    pub fn new<P: Into<PathBuf>>(path: P, format: FileFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    /// Open a file whose format is detected from its extension
    pub fn detect<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let format = FileFormat::from_path(&path)?;
        Ok(Self { path, format })
    }
}

impl RecordSource for SequenceFile {
    fn records(&self) -> Result<RecordIter> {
        let reader = open_reader(&self.path)?;
        Ok(match self.format {
            FileFormat::Fastq => Box::new(FastqReader::new(reader)),
            FileFormat::Fasta => Box::new(FastaReader::new(reader)),
        })
    }
}

/// Create a file sink for `format`, gzip-compressed when the path ends in `.gz`
pub fn create_sink<P: AsRef<Path>>(path: P, format: FileFormat) -> Result<Box<dyn RecordSink>> {
    let writer = open_writer(path.as_ref())?;
    Ok(match format {
        FileFormat::Fastq => Box::new(FastqWriter::new(writer)),
        FileFormat::Fasta => Box::new(FastaWriter::new(writer)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_path("reads.fastq").unwrap(), FileFormat::Fastq);
        assert_eq!(FileFormat::from_path("reads.FQ.gz").unwrap(), FileFormat::Fastq);
        assert_eq!(FileFormat::from_path("/tmp/contigs.fna").unwrap(), FileFormat::Fasta);
        assert_eq!(FileFormat::from_path("x.fa.gz").unwrap(), FileFormat::Fasta);
        assert!(matches!(FileFormat::from_path("reads.bam"), Err(QcError::UnknownFormat(_))));
        assert!(FileFormat::from_path("fastq").is_err());
    }

    #[test]
    fn test_vec_source_is_reiterable() {
        let source = vec![
            SeqRecord::without_quality("a", b"AC".to_vec()),
            SeqRecord::without_quality("b", b"GT".to_vec()),
        ];
        let first: Vec<_> = source.records().unwrap().collect::<Result<_>>().unwrap();
        let second: Vec<_> = source.records().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
