pub mod estimator;
pub mod penalty;
pub mod predictor;

pub use estimator::CongestionEstimator;
pub use penalty::{PenaltyEntry, compute_penalties};
pub use predictor::{ConvPredictor, SpatialPredictor};
