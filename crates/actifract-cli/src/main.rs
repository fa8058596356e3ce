use actifract_lib::{
    config::AnalysisConfig,
    io::{counts as counts_io, parse_timestamp, raw as raw_io, text as text_io},
    metrics::{
        adapted_allometric_aggregation, allometric_aggregation, daily_mean_std, pearson,
        sample_every, sliding_window_activity, summary::MINUTES_PER_DAY, sweep, Evolution,
    },
    plot::{
        figure_dimension_across_scales, figure_evolution_track, figure_loglog_fixed,
        figure_loglog_multi, Figure, Series,
    },
    preprocess::{run_counts_pipeline, Column, Metric},
    signal::CountsSeries,
    synth::synthetic_counts,
    timebase::parse_duration,
};
use anyhow::{anyhow, Result};
use chrono::Duration;
use clap::{Args, Parser, Subcommand};
use plotters::prelude::*;
use serde::Serialize;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "actifract",
    version,
    about = "Activity counts and allometric complexity of actigraphy recordings"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a headerless Time,X,Y,Z recording into activity counts
    Counts {
        #[arg(long)]
        input: PathBuf,
        /// Write counts CSV here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        metric: Option<Metric>,
        /// R or ENMO
        #[arg(long, value_parser = parse_column)]
        column: Option<Column>,
        #[arg(long)]
        fs: Option<f64>,
        #[arg(long)]
        lowcut_hz: Option<f64>,
        #[arg(long)]
        highcut_hz: Option<f64>,
        #[arg(long)]
        order: Option<usize>,
        #[arg(long, value_parser = duration_arg)]
        epoch: Option<Duration>,
        #[arg(long, value_parser = duration_arg)]
        interval: Option<Duration>,
    },
    /// Fixed-block allometric fractal dimension
    Allometric {
        #[command(flatten)]
        input: CountsInput,
        #[arg(long, default_value_t = MINUTES_PER_DAY)]
        n_max: usize,
        /// Also render the log-log fit to this PNG
        #[arg(long)]
        plot: Option<PathBuf>,
    },
    /// Multi-scale allometric fractal dimension
    AllometricMulti {
        #[command(flatten)]
        input: CountsInput,
        #[command(flatten)]
        scales: ScaleArgs,
    },
    /// Multi-scale dimension over sliding windows
    Evolution {
        #[command(flatten)]
        input: CountsInput,
        #[command(flatten)]
        window: WindowArgs,
        /// Also report activity sums per window and their correlation with
        /// the dimension at this scale index
        #[arg(long)]
        activity_scale_index: Option<usize>,
        /// Correlate only every n-th window
        #[arg(long, default_value_t = 1)]
        sample_every: usize,
    },
    /// Mean and standard deviation of daily count totals
    DailyStats {
        #[command(flatten)]
        input: CountsInput,
        #[arg(long, default_value_t = MINUTES_PER_DAY)]
        epochs_per_day: usize,
    },
    /// Generate minute counts from fractional Gaussian noise
    Simulate {
        #[arg(long, default_value_t = 4 * MINUTES_PER_DAY)]
        len: usize,
        #[arg(long, default_value_t = 0.7)]
        hurst: f64,
        #[arg(long, default_value_t = 200.0)]
        mean: f64,
        #[arg(long, default_value_t = 150.0)]
        sd: f64,
        #[arg(long, default_value = "2020-01-01 00:00:00")]
        start: String,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Render dimension across scales (or the log-log fit) to a PNG
    PlotScales {
        #[command(flatten)]
        input: CountsInput,
        #[command(flatten)]
        scales: ScaleArgs,
        #[arg(long)]
        loglog: bool,
        #[arg(long)]
        out: PathBuf,
    },
    /// Render the dimension track at one scale to a PNG
    PlotEvolution {
        #[command(flatten)]
        input: CountsInput,
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, default_value_t = 0)]
        scale_index: usize,
        #[arg(long, default_value_t = 2048)]
        max_points: usize,
        #[arg(long)]
        out: PathBuf,
    },
}

/// Counts CSV from `--input` or stdin.
#[derive(Args)]
struct CountsInput {
    #[arg(long)]
    input: Option<PathBuf>,
    /// Input is a newline-delimited series without timestamps
    #[arg(long)]
    plain: bool,
}

#[derive(Args)]
struct ScaleArgs {
    #[arg(long, default_value_t = 1)]
    n_min: usize,
    #[arg(long, default_value_t = MINUTES_PER_DAY)]
    n_max: usize,
    #[arg(long, default_value_t = actifract_lib::metrics::DEFAULT_SPREAD)]
    spread: f64,
}

#[derive(Args)]
struct WindowArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_parser = duration_arg)]
    width: Option<Duration>,
    #[arg(long, value_parser = duration_arg)]
    step: Option<Duration>,
    #[arg(long)]
    n_min: Option<usize>,
    #[arg(long)]
    n_max: Option<usize>,
    #[arg(long)]
    spread: Option<f64>,
}

#[derive(Serialize)]
struct EvolutionReport {
    #[serde(flatten)]
    evolution: Evolution,
    #[serde(skip_serializing_if = "Option::is_none")]
    activity: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation: Option<f64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Counts {
            input,
            out,
            config,
            metric,
            column,
            fs,
            lowcut_hz,
            highcut_hz,
            order,
            epoch,
            interval,
        } => {
            let mut cfg = load_config(config.as_deref())?.pipeline_config()?;
            if let Some(v) = metric {
                cfg.metric = v;
            }
            if let Some(v) = column {
                cfg.column = v;
            }
            if let Some(v) = fs {
                cfg.fs = v;
            }
            if let Some(v) = lowcut_hz {
                cfg.lowcut_hz = v;
            }
            if let Some(v) = highcut_hz {
                cfg.highcut_hz = v;
            }
            if let Some(v) = order {
                cfg.order = v;
            }
            if let Some(v) = epoch {
                cfg.epoch = v;
            }
            if let Some(v) = interval {
                cfg.interval = v;
            }
            let samples = raw_io::read_raw_csv(&input)?;
            let counts = run_counts_pipeline(samples, &cfg)?;
            match out {
                Some(path) => counts_io::write_counts_csv(&path, &counts)?,
                None => counts_io::write_counts(io::stdout().lock(), &counts)?,
            }
        }
        Commands::Allometric { input, n_max, plot } => {
            let values = read_values(&input)?;
            let fit = allometric_aggregation(&values, n_max)?;
            if let Some(path) = plot {
                draw_plotters_figure(&path, &figure_loglog_fixed(&fit))?;
            }
            println!("{}", serde_json::to_string(&fit)?);
        }
        Commands::AllometricMulti { input, scales } => {
            let values = read_values(&input)?;
            let fit = adapted_allometric_aggregation(&values, scales.n_min, scales.n_max, scales.spread)?;
            println!("{}", serde_json::to_string(&fit)?);
        }
        Commands::Evolution {
            input,
            window,
            activity_scale_index,
            sample_every,
        } => {
            let series = read_counts(&input)?;
            let report = cmd_evolution(&series, &window, activity_scale_index, sample_every)?;
            println!("{}", serde_json::to_string(&report)?);
        }
        Commands::DailyStats {
            input,
            epochs_per_day,
        } => {
            let series = read_counts(&input)?;
            let stats = daily_mean_std(&series, epochs_per_day)?;
            println!("{}", serde_json::to_string(&stats)?);
        }
        Commands::Simulate {
            len,
            hurst,
            mean,
            sd,
            start,
            seed,
            out,
        } => {
            let series = synthetic_counts(len, hurst, mean, sd, parse_timestamp(&start)?, seed)?;
            match out {
                Some(path) => counts_io::write_counts_csv(&path, &series)?,
                None => counts_io::write_counts(io::stdout().lock(), &series)?,
            }
        }
        Commands::PlotScales {
            input,
            scales,
            loglog,
            out,
        } => {
            let values = read_values(&input)?;
            let fit = adapted_allometric_aggregation(&values, scales.n_min, scales.n_max, scales.spread)?;
            let fig = if loglog {
                figure_loglog_multi(&fit)
            } else {
                figure_dimension_across_scales(&fit)
            };
            draw_plotters_figure(&out, &fig)?;
        }
        Commands::PlotEvolution {
            input,
            window,
            scale_index,
            max_points,
            out,
        } => {
            let series = read_counts(&input)?;
            let evolution = sweep(&series, &window_config(&window)?)?;
            let fig = figure_evolution_track(&evolution, scale_index, max_points)?;
            draw_plotters_figure(&out, &fig)?;
        }
    }
    Ok(())
}

fn duration_arg(text: &str) -> std::result::Result<Duration, String> {
    parse_duration(text).map_err(|e| e.to_string())
}

fn parse_column(text: &str) -> std::result::Result<Column, String> {
    match text.to_ascii_uppercase().as_str() {
        "R" => Ok(Column::R),
        "ENMO" => Ok(Column::Enmo),
        other => Err(format!("unknown column {other:?} (expected R or ENMO)")),
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::load(path),
        None => Ok(AnalysisConfig::default()),
    }
}

fn window_config(args: &WindowArgs) -> Result<actifract_lib::metrics::EvolutionConfig> {
    let mut cfg = load_config(args.config.as_deref())?.evolution_config()?;
    if let Some(v) = args.width {
        cfg.width = v;
    }
    if let Some(v) = args.step {
        cfg.step = v;
    }
    if let Some(v) = args.n_min {
        cfg.n_min = v;
    }
    if let Some(v) = args.n_max {
        cfg.n_max = v;
    }
    if let Some(v) = args.spread {
        cfg.spread = v;
    }
    Ok(cfg)
}

fn cmd_evolution(
    series: &CountsSeries,
    window: &WindowArgs,
    activity_scale_index: Option<usize>,
    stride: usize,
) -> Result<EvolutionReport> {
    if stride == 0 {
        return Err(anyhow!("--sample-every must be at least 1"));
    }
    let cfg = window_config(window)?;
    let evolution = sweep(series, &cfg)?;
    let (activity, correlation) = match activity_scale_index {
        Some(idx) => {
            let (sums, _) = sliding_window_activity(series, cfg.width, cfg.step)?;
            let track = sample_every(&evolution.track(idx)?, stride);
            let sampled = sample_every(&sums, stride);
            let r = if track.len() >= 2 {
                Some(pearson(&track, &sampled)?)
            } else {
                None
            };
            (Some(sums), r)
        }
        None => (None, None),
    };
    Ok(EvolutionReport {
        evolution,
        activity,
        correlation,
    })
}

fn read_counts(input: &CountsInput) -> Result<CountsSeries> {
    if input.plain {
        return Err(anyhow!("this command needs timestamps; pass a counts CSV"));
    }
    match input.input.as_deref() {
        Some(path) => counts_io::read_counts_csv(path),
        None => counts_io::read_counts(io::stdin().lock()),
    }
}

fn read_values(input: &CountsInput) -> Result<Vec<f64>> {
    if input.plain {
        return match input.input.as_deref() {
            Some(path) => text_io::read_f64_series(path),
            None => {
                let mut buf = String::new();
                io::stdin().read_to_string(&mut buf)?;
                text_io::parse_f64_series(&buf)
            }
        };
    }
    Ok(read_counts(input)?.into_counts())
}

fn draw_plotters_figure(path: &Path, fig: &Figure) -> Result<()> {
    let (mut x_min, mut x_max, mut y_min, mut y_max) = fig
        .bounds()
        .ok_or_else(|| anyhow!("nothing to plot"))?;
    if x_max <= x_min {
        x_min -= 0.5;
        x_max += 0.5;
    }
    if y_max <= y_min {
        y_min -= 0.5;
        y_max += 0.5;
    }
    let backend = BitMapBackend::new(path, (800, 480));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "Plot".into()),
            ("sans-serif", 24),
        )
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    chart
        .configure_mesh()
        .x_desc(fig.x.label.clone().unwrap_or_default())
        .y_desc(fig.y.label.clone().unwrap_or_default())
        .draw()?;
    for series in &fig.series {
        match series {
            Series::Line(line) => {
                let (r, g, b) = line.style.color.rgb();
                chart.draw_series(LineSeries::new(
                    line.points
                        .iter()
                        .filter(|p| p[0].is_finite() && p[1].is_finite())
                        .map(|p| (p[0], p[1])),
                    RGBColor(r, g, b).stroke_width(line.style.width.round() as u32),
                ))?;
            }
            Series::Scatter(points) => {
                let (r, g, b) = points.style.color.rgb();
                let size = points.style.width.round() as i32;
                chart.draw_series(
                    points
                        .points
                        .iter()
                        .filter(|p| p[0].is_finite() && p[1].is_finite())
                        .map(|p| Circle::new((p[0], p[1]), size, RGBColor(r, g, b).filled())),
                )?;
            }
        }
    }
    root.present()?;
    log::info!("wrote {}", path.display());
    Ok(())
}
