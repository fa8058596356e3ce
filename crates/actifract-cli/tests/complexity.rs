use assert_cmd::cargo::cargo_bin_cmd;
use serde::Deserialize;
use std::{error::Error, fs, path::Path};
use tempfile::tempdir;

#[derive(Deserialize)]
struct Fit {
    dimension: f64,
    means: Vec<f64>,
}

#[derive(Deserialize)]
struct MultiFit {
    dimensions: Vec<f64>,
    scales: Vec<usize>,
}

#[derive(Deserialize)]
struct EvolutionOutput {
    dimensions: Vec<Vec<f64>>,
    end_timestamps: Vec<String>,
    scales: Vec<usize>,
    activity: Option<Vec<f64>>,
    correlation: Option<f64>,
}

#[derive(Deserialize)]
struct DailyStats {
    days: usize,
    mean: f64,
}

fn simulate(path: &Path, len: usize, hurst: f64) {
    let mut cmd = cargo_bin_cmd!("actifract");
    cmd.args([
        "simulate",
        "--len",
        &len.to_string(),
        "--hurst",
        &hurst.to_string(),
        "--mean",
        "500",
        "--sd",
        "50",
        "--seed",
        "7",
        "--out",
        path.to_str().expect("utf8 path"),
    ]);
    cmd.assert().success();
}

#[test]
fn white_noise_counts_have_dimension_one_and_a_half() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let counts = dir.path().join("counts.csv");
    // 5040 is divisible by every block length up to 10
    simulate(&counts, 5040, 0.5);

    let mut cmd = cargo_bin_cmd!("actifract");
    cmd.args([
        "allometric",
        "--input",
        counts.to_str().expect("utf8 path"),
        "--n-max",
        "10",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let fit: Fit = serde_json::from_slice(&output)?;
    assert_eq!(fit.means.len(), 10);
    assert!((fit.dimension - 1.5).abs() < 0.15, "D = {}", fit.dimension);

    let mut cmd = cargo_bin_cmd!("actifract");
    cmd.args([
        "allometric-multi",
        "--input",
        counts.to_str().expect("utf8 path"),
        "--n-max",
        "120",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let fit: MultiFit = serde_json::from_slice(&output)?;
    assert_eq!(fit.dimensions.len(), fit.scales.len());
    assert_eq!(fit.scales[0], 1);
    Ok(())
}

#[test]
fn plain_series_input() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let series = dir.path().join("series.txt");
    let text: String = (0..200).map(|i| format!("{}\n", 10 + (i * 7919) % 13)).collect();
    fs::write(&series, format!("# counts\n{text}"))?;

    let mut cmd = cargo_bin_cmd!("actifract");
    cmd.args([
        "allometric",
        "--plain",
        "--input",
        series.to_str().expect("utf8 path"),
        "--n-max",
        "10",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let fit: Fit = serde_json::from_slice(&output)?;
    assert!(fit.dimension.is_finite());
    Ok(())
}

#[test]
fn evolution_reports_one_row_per_window() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let counts = dir.path().join("counts.csv");
    simulate(&counts, 1440, 0.7);

    let mut cmd = cargo_bin_cmd!("actifract");
    cmd.args([
        "evolution",
        "--input",
        counts.to_str().expect("utf8 path"),
        "--width",
        "720 min",
        "--step",
        "30 min",
        "--n-max",
        "60",
        "--activity-scale-index",
        "0",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let evo: EvolutionOutput = serde_json::from_slice(&output)?;
    assert_eq!(evo.end_timestamps.len(), 24);
    assert_eq!(evo.dimensions.len(), 24);
    assert!(evo.dimensions.iter().all(|row| row.len() == evo.scales.len()));
    assert_eq!(evo.end_timestamps[0], "2020-01-01T12:00:00");
    assert_eq!(evo.activity.map(|a| a.len()), Some(24));
    assert!(evo.correlation.is_some());
    Ok(())
}

#[test]
fn evolution_correlation_on_every_fourth_window() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let counts = dir.path().join("counts.csv");
    simulate(&counts, 1440, 0.7);
    let path = counts.to_str().expect("utf8 path");
    let base = [
        "evolution", "--input", path, "--width", "720 min", "--step", "30 min", "--n-max", "60",
        "--activity-scale-index", "0",
    ];

    let mut cmd = cargo_bin_cmd!("actifract");
    cmd.args(base).args(["--sample-every", "4"]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let evo: EvolutionOutput = serde_json::from_slice(&output)?;
    // the full activity track is still reported
    assert_eq!(evo.activity.map(|a| a.len()), Some(24));
    let r = evo.correlation.expect("correlation over six windows");
    assert!((-1.0..=1.0).contains(&r));

    let mut cmd = cargo_bin_cmd!("actifract");
    cmd.args(base).args(["--sample-every", "0"]);
    cmd.assert().failure();
    Ok(())
}

#[test]
fn evolution_rejects_unknown_duration() {
    let mut cmd = cargo_bin_cmd!("actifract");
    cmd.args(["evolution", "--step", "5 parsecs"]);
    cmd.assert().failure();
}

#[test]
fn daily_stats_skip_partial_day() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let counts = dir.path().join("counts.csv");
    simulate(&counts, 2 * 1440 + 300, 0.5);

    let mut cmd = cargo_bin_cmd!("actifract");
    cmd.args(["daily-stats", "--input", counts.to_str().expect("utf8 path")]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let stats: DailyStats = serde_json::from_slice(&output)?;
    assert_eq!(stats.days, 2);
    assert!((stats.mean / 1440.0 - 500.0).abs() < 25.0);
    Ok(())
}
