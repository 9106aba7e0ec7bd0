//! Dataset output.
//!
//! One line per record: features with six decimals, space separated, then
//! the integer label.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use timeslot_core::{Error, FeatureLabelRecord, Result};

/// Line-oriented writer for feature/label records.
pub struct RecordWriter<W: Write> {
    inner: W,
    written: u64,
}

impl RecordWriter<BufWriter<File>> {
    /// Create (or truncate) the dataset file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Append one record.
    pub fn write_record(&mut self, record: &FeatureLabelRecord) -> Result<()> {
        writeln!(self.inner, "{}", record.to_line())?;
        self.written += 1;
        Ok(())
    }

    /// Records written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Load a dataset file. Blank lines are skipped.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<FeatureLabelRecord>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = FeatureLabelRecord::parse_line(&line)
            .map_err(|e| Error::parse(format!("{} line {}: {}", path.display(), i + 1, e)))?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_writer_format() {
        let mut writer = RecordWriter::new(Vec::new());
        writer
            .write_record(&FeatureLabelRecord::new(vec![0.5, -0.00002], 0))
            .unwrap();
        writer
            .write_record(&FeatureLabelRecord::new(vec![1.0], 1))
            .unwrap();
        assert_eq!(writer.written(), 2);

        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(text, "0.500000 -0.000020 0\n1.000000 1\n");
    }

    #[test]
    fn test_file_written_and_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dataset.txt");

        let mut writer = RecordWriter::create(&path).unwrap();
        writer
            .write_record(&FeatureLabelRecord::new(vec![-0.0002, 0.0015, 0.25], 1))
            .unwrap();
        writer.flush().unwrap();
        drop(writer);

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].features, vec![-0.0002, 0.0015, 0.25]);
        assert_eq!(records[0].label, 1);
    }

    #[test]
    fn test_read_reports_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        std::fs::write(&path, "0.1 0\n\n0.2 x\n").unwrap();

        match read_records(&path) {
            Err(Error::Parse(msg)) => assert!(msg.contains("line 3"), "{}", msg),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
