pub mod config;
pub mod error;
pub mod io;
pub mod metrics;
pub mod plot;
pub mod preprocess;
pub mod signal;
pub mod synth;
pub mod timebase;

pub use error::{AnalysisError, Result};
pub use metrics::*;
pub use preprocess::*;
pub use signal::*;
