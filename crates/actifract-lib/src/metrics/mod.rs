pub mod allometric;
pub mod blocks;
pub mod evolution;
pub mod summary;

pub use allometric::{
    adapted_allometric_aggregation, allometric_aggregation, AllometricFit, MultiScaleFit,
    DEFAULT_SPREAD,
};
pub use blocks::{AggregationScale, BlockSums, CumulativeSums, ScaleLadder};
pub use evolution::{complexity_evolution, sweep, Evolution, EvolutionConfig, Window};
pub use summary::{daily_mean_std, pearson, sample_every, sliding_window_activity, DailyStats};
