//! FASTA reader and writer
//!
//! Multi-line sequences are joined into one record. FASTA carries no
//! qualities, so every record comes back without them.

use crate::error::{QcError, Result};
use crate::io::fastq::trim_line;
use crate::io::RecordSink;
use crate::record::SeqRecord;
use std::io::{BufRead, Write};

/// Streaming FASTA parser
pub struct FastaReader<R: BufRead> {
    reader: R,
    line: Vec<u8>,
    /// Header already consumed while reading the previous record
    pending_header: Option<String>,
    line_number: usize,
    finished: bool,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::with_capacity(256),
            pending_header: None,
            line_number: 0,
            finished: false,
        }
    }

    fn next_line(&mut self) -> Result<bool> {
        self.line.clear();
        let n = self.reader.read_until(b'\n', &mut self.line)?;
        if n == 0 {
            return Ok(false);
        }
        self.line_number += 1;
        Ok(true)
    }

    /// Decode the current line's header text after `>`
    fn header(&self) -> Result<String> {
        let text = trim_line(&self.line);
        match std::str::from_utf8(&text[1..]) {
            Ok(header) => Ok(header.to_string()),
            Err(e) => Err(QcError::InvalidFasta {
                line: self.line_number,
                msg: format!("Header is not valid UTF-8: {}", e),
            }),
        }
    }

    fn read_record(&mut self) -> Result<Option<SeqRecord>> {
        if self.finished {
            return Ok(None);
        }

        let header = match self.pending_header.take() {
            Some(header) => header,
            None => loop {
                if !self.next_line()? {
                    self.finished = true;
                    return Ok(None);
                }
                let trimmed = trim_line(&self.line);
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed.starts_with(b">") {
                    break self.header()?;
                }
                return Err(QcError::InvalidFasta {
                    line: self.line_number,
                    msg: format!(
                        "Expected '>' at start of header, got: {}",
                        String::from_utf8_lossy(trimmed)
                    ),
                });
            },
        };

        let mut sequence = Vec::new();
        loop {
            if !self.next_line()? {
                self.finished = true;
                break;
            }
            let trimmed = trim_line(&self.line);
            if trimmed.starts_with(b">") {
                self.pending_header = Some(self.header()?);
                break;
            }
            let start = trimmed
                .iter()
                .position(|b| !b.is_ascii_whitespace())
                .unwrap_or(trimmed.len());
            sequence.extend_from_slice(&trimmed[start..]);
        }

        Ok(Some(SeqRecord::without_quality(header, sequence)))
    }
}

impl<R: BufRead> Iterator for FastaReader<R> {
    type Item = Result<SeqRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.read_record().transpose();
        if matches!(item, Some(Err(_))) {
            self.finished = true;
        }
        item
    }
}

/// FASTA formatter; qualities are dropped
pub struct FastaWriter<W: Write> {
    writer: W,
}

impl<W: Write> FastaWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> RecordSink for FastaWriter<W> {
    fn write_record(&mut self, record: &SeqRecord) -> Result<()> {
        self.writer.write_all(b">")?;
        self.writer.write_all(record.id.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.write_all(&record.sequence)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
