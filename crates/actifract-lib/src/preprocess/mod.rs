//! Raw acceleration to activity counts.

pub mod aggregate;
pub mod counts;
pub mod filter;
pub mod pipeline;

pub use aggregate::{aggregate, Aggregated, Column, Metric};
pub use counts::{aggregate_counts, calculate_counts, RESOLUTION};
pub use filter::{bandpass_filter, butter_filter, butterworth_sos, Band, Sos};
pub use pipeline::{run_actigraph_pipeline, run_counts_pipeline, CountsPipelineConfig};
