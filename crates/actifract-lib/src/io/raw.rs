use super::parse_timestamp;
use crate::signal::RawSample;
use anyhow::{anyhow, Context, Result};
use csv::{Reader, ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One day of samples at 50 Hz.
pub const DEFAULT_CHUNK_ROWS: usize = 4_320_000;

/// Headerless `Time,X,Y,Z` rows read in bounded chunks.
pub struct RawChunks<R: Read> {
    reader: Reader<R>,
    record: StringRecord,
    chunk_rows: usize,
    line: u64,
    done: bool,
}

impl RawChunks<File> {
    pub fn open(path: &Path, chunk_rows: usize) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        Ok(Self::from_reader(file, chunk_rows))
    }
}

impl<R: Read> RawChunks<R> {
    pub fn from_reader(rdr: R, chunk_rows: usize) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_reader(rdr);
        Self {
            reader,
            record: StringRecord::new(),
            chunk_rows: chunk_rows.max(1),
            line: 0,
            done: false,
        }
    }

    fn next_chunk(&mut self) -> Result<Vec<RawSample>> {
        let mut chunk = Vec::with_capacity(self.chunk_rows.min(1 << 16));
        while chunk.len() < self.chunk_rows {
            if !self.reader.read_record(&mut self.record).context("reading record")? {
                self.done = true;
                break;
            }
            self.line += 1;
            chunk.push(parse_row(&self.record).with_context(|| format!("row {}", self.line))?);
        }
        Ok(chunk)
    }
}

impl<R: Read> Iterator for RawChunks<R> {
    type Item = Result<Vec<RawSample>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_chunk() {
            Ok(chunk) if chunk.is_empty() => None,
            Ok(chunk) => Some(Ok(chunk)),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

fn parse_row(record: &StringRecord) -> Result<RawSample> {
    if record.len() < 4 {
        return Err(anyhow!("expected 4 fields, found {}", record.len()));
    }
    let axis = |idx: usize, name: &str| -> Result<f32> {
        record[idx]
            .parse::<f32>()
            .with_context(|| format!("parsing {name} value {:?}", &record[idx]))
    };
    Ok(RawSample {
        timestamp: parse_timestamp(&record[0])?,
        x: axis(1, "X")?,
        y: axis(2, "Y")?,
        z: axis(3, "Z")?,
    })
}

/// Read a whole raw recording into memory.
pub fn read_raw_csv(path: &Path) -> Result<Vec<RawSample>> {
    let mut samples = Vec::new();
    for chunk in RawChunks::open(path, DEFAULT_CHUNK_ROWS)? {
        samples.extend(chunk?);
    }
    log::debug!("read {} raw samples from {}", samples.len(), path.display());
    Ok(samples)
}
