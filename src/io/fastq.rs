//! FASTQ reader and writer

use crate::error::{QcError, Result};
use crate::io::RecordSink;
use crate::record::SeqRecord;
use std::io::{BufRead, Write};

/// Streaming FASTQ parser yielding one record at a time
///
/// Line buffers are reused between records, so memory stays flat no matter
/// how large the file is. Lines are read as raw bytes; only the header has
/// to be valid UTF-8.
pub struct FastqReader<R: BufRead> {
    reader: R,
    header: Vec<u8>,
    sequence: Vec<u8>,
    separator: Vec<u8>,
    quality: Vec<u8>,
    line_number: usize,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            header: Vec::with_capacity(256),
            sequence: Vec::with_capacity(256),
            separator: Vec::with_capacity(8),
            quality: Vec::with_capacity(256),
            line_number: 0,
        }
    }

    fn read_line(&mut self, which: Line) -> Result<usize> {
        let buffer = match which {
            Line::Header => &mut self.header,
            Line::Sequence => &mut self.sequence,
            Line::Separator => &mut self.separator,
            Line::Quality => &mut self.quality,
        };
        buffer.clear();
        let n = self.reader.read_until(b'\n', buffer)?;
        if n > 0 {
            self.line_number += 1;
        }
        Ok(n)
    }

    fn read_record(&mut self) -> Result<Option<SeqRecord>> {
        // Skip blank lines between records
        loop {
            if self.read_line(Line::Header)? == 0 {
                return Ok(None);
            }
            if !trim_line(&self.header).is_empty() {
                break;
            }
        }
        let header_line = self.line_number;

        if !self.header.starts_with(b"@") {
            return Err(QcError::InvalidFastq {
                line: header_line,
                msg: format!(
                    "Expected '@' at start of header, got: {}",
                    String::from_utf8_lossy(trim_line(&self.header))
                ),
            });
        }
        let id = match std::str::from_utf8(trim_line(&self.header[1..])) {
            Ok(id) => id.to_string(),
            Err(e) => {
                return Err(QcError::InvalidFastq {
                    line: header_line,
                    msg: format!("Header is not valid UTF-8: {}", e),
                })
            }
        };

        if self.read_line(Line::Sequence)? == 0 {
            return Err(self.truncated("Unexpected end of file after header"));
        }
        if self.read_line(Line::Separator)? == 0 {
            return Err(self.truncated("Unexpected end of file after sequence"));
        }
        if !self.separator.starts_with(b"+") {
            return Err(QcError::InvalidFastq {
                line: self.line_number,
                msg: format!(
                    "Expected '+' at start of separator, got: {}",
                    String::from_utf8_lossy(trim_line(&self.separator))
                ),
            });
        }
        if self.read_line(Line::Quality)? == 0 {
            return Err(self.truncated("Unexpected end of file after separator"));
        }

        let sequence = trim_line(&self.sequence).to_vec();
        let quality = trim_line(&self.quality).to_vec();

        if sequence.len() != quality.len() {
            return Err(QcError::InvalidFastq {
                line: self.line_number,
                msg: format!(
                    "Sequence length ({}) != quality length ({})",
                    sequence.len(),
                    quality.len()
                ),
            });
        }

        Ok(Some(SeqRecord {
            id,
            sequence,
            quality: Some(quality),
        }))
    }

    fn truncated(&self, msg: &str) -> QcError {
        QcError::InvalidFastq {
            line: self.line_number,
            msg: msg.to_string(),
        }
    }
}

/// Strip trailing whitespace, including `\r\n`
pub(crate) fn trim_line(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    &line[..end]
}

#[derive(Clone, Copy)]
enum Line {
    Header,
    Sequence,
    Separator,
    Quality,
}

impl<R: BufRead> Iterator for FastqReader<R> {
    type Item = Result<SeqRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

/// FASTQ formatter
pub struct FastqWriter<W: Write> {
    writer: W,
}

impl<W: Write> FastqWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> RecordSink for FastqWriter<W> {
    fn write_record(&mut self, record: &SeqRecord) -> Result<()> {
        let quality = record.require_quality()?;
        self.writer.write_all(b"@")?;
        self.writer.write_all(record.id.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.write_all(&record.sequence)?;
        self.writer.write_all(b"\n+\n")?;
        self.writer.write_all(quality)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(data: &[u8]) -> Result<Vec<SeqRecord>> {
        FastqReader::new(Cursor::new(data)).collect()
    }

    #[test]
    fn test_parse_valid_fastq() {
        let records = parse(b"@SEQ_ID\nGATTACA\n+\n!!!!!!!\n").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "SEQ_ID");
        assert_eq!(records[0].sequence, b"GATTACA");
        assert_eq!(records[0].quality.as_deref(), Some(&b"!!!!!!!"[..]));
    }

    #[test]
    fn test_parse_multiple_records_with_crlf() {
        let records = parse(b"@SEQ1\r\nGAT\r\n+\r\n!!!\r\n\n@SEQ2\nTACA\n+SEQ2\nIIII\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sequence, b"GAT");
        assert_eq!(records[1].id, "SEQ2");
    }

    #[test]
    fn test_invalid_header() {
        let result = parse(b"SEQ_ID\nGATTACA\n+\n!!!!!!!\n");
        assert!(matches!(result, Err(QcError::InvalidFastq { line: 1, .. })));
    }

    #[test]
    fn test_non_utf8_header_reports_line() {
        let result = parse(b"@ok\nACGT\n+\nIIII\n@bad\xFF\nACGT\n+\nIIII\n");
        assert!(matches!(result, Err(QcError::InvalidFastq { line: 5, .. })));
    }

    #[test]
    fn test_non_utf8_sequence_bytes_are_kept() {
        let records = parse(b"@r\nAC\xC3G\n+\nIIII\n").unwrap();
        assert_eq!(records[0].sequence, b"AC\xC3G");
    }

    #[test]
    fn test_length_mismatch() {
        let result = parse(b"@r\nGATTACA\n+\n!!!\n");
        assert!(matches!(result, Err(QcError::InvalidFastq { line: 4, .. })));
    }

    #[test]
    fn test_truncated_record() {
        let result = parse(b"@r\nGATTACA\n");
        assert!(matches!(result, Err(QcError::InvalidFastq { .. })));
    }

    #[test]
    fn test_writer_output() {
        let mut writer = FastqWriter::new(Vec::new());
        let record = SeqRecord::with_quality("r1", b"ACGT".to_vec(), b"IIII".to_vec()).unwrap();
        writer.write_record(&record).unwrap();
        assert_eq!(writer.into_inner(), b"@r1\nACGT\n+\nIIII\n");
    }

    #[test]
    fn test_writer_rejects_fasta_record() {
        let mut writer = FastqWriter::new(Vec::new());
        let record = SeqRecord::without_quality("r1", b"ACGT".to_vec());
        assert!(matches!(writer.write_record(&record), Err(QcError::MissingQuality { .. })));
    }
}
