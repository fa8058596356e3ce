use anyhow::{Context, Result};
use std::path::Path;

/// Parse a newline-delimited `f64` series, skipping blank and `#` lines.
pub fn parse_f64_series(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let val: f64 = trimmed
            .parse()
            .with_context(|| format!("line {} is not f64: {}", idx + 1, trimmed))?;
        out.push(val);
    }
    if out.is_empty() {
        anyhow::bail!("no numeric samples found");
    }
    Ok(out)
}

pub fn read_f64_series(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_f64_series(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_comments_and_blanks() {
        let values = parse_f64_series("# counts\n1\n\n 2.5 \n#\n-3e1\n").unwrap();
        assert_eq!(values, vec![1.0, 2.5, -30.0]);
    }

    #[test]
    fn reports_bad_line() {
        let err = parse_f64_series("1\nx\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(parse_f64_series("# nothing\n").is_err());
    }
}
