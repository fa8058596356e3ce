use super::{format_timestamp, parse_timestamp};
use crate::signal::CountsSeries;
use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::io::{Read, Write};
use std::path::Path;

/// Read a `Time,counts` table. The header row is skipped; an empty counts
/// field is read as a missing epoch (NaN).
pub fn read_counts<R: Read>(rdr: R) -> Result<CountsSeries> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(rdr);
    let mut timestamps = Vec::new();
    let mut counts = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.context("reading record")?;
        let line = idx + 2;
        let ts = record
            .get(0)
            .ok_or_else(|| anyhow!("line {line}: missing timestamp"))?;
        let value = record
            .get(1)
            .ok_or_else(|| anyhow!("line {line}: missing counts"))?;
        timestamps.push(parse_timestamp(ts).with_context(|| format!("line {line}"))?);
        counts.push(if value.is_empty() {
            f64::NAN
        } else {
            value
                .parse::<f64>()
                .with_context(|| format!("line {line}: counts {value:?}"))?
        });
    }
    Ok(CountsSeries::new(timestamps, counts)?)
}

pub fn read_counts_csv(path: &Path) -> Result<CountsSeries> {
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let series = read_counts(file).with_context(|| format!("reading {}", path.display()))?;
    log::debug!("read {} epochs from {}", series.len(), path.display());
    Ok(series)
}

pub fn write_counts<W: Write>(wtr: W, series: &CountsSeries) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(wtr);
    writer.write_record(["Time", "counts"])?;
    for (ts, value) in series.timestamps().iter().zip(series.counts()) {
        let value = if value.is_nan() {
            String::new()
        } else {
            value.to_string()
        };
        writer.write_record([format_timestamp(ts), value])?;
    }
    writer.flush().context("flushing counts")?;
    Ok(())
}

pub fn write_counts_csv(path: &Path, series: &CountsSeries) -> Result<()> {
    let file =
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_counts(file, series)
}
