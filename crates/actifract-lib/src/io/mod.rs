//! Readers and writers for raw accelerometry and count files.

pub mod counts;
pub mod raw;
pub mod text;

use anyhow::{anyhow, Result};
use chrono::NaiveDateTime;

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a wall-clock timestamp with either a space or an ISO `T` separator.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .ok_or_else(|| anyhow!("unrecognised timestamp {text:?}"))
}

pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}
