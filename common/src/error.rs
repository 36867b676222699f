use thiserror::Error;

/// Failures raised by metric evaluation and congestion fusion.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("{context}: grid dimension mismatch, expected {expected:?} got {found:?}")]
    DimensionMismatch {
        context: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("{context}: expected {expected} channel(s), got {found}")]
    ChannelMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("buffer of length {len} does not fit shape {channels}x{height}x{width}")]
    ShapeMismatch {
        len: usize,
        channels: usize,
        height: usize,
        width: usize,
    },

    #[error("{excess} excess-area region(s) but {areas} movable-area region(s)")]
    RegionCountMismatch { excess: usize, areas: usize },

    #[error("metric `{metric}` requires the `{requires}` operator")]
    MissingDependency {
        metric: &'static str,
        requires: &'static str,
    },

    #[error("`{0}` has no region values")]
    EmptyRegions(&'static str),

    #[error("unknown metric name `{0}`")]
    UnknownMetric(String),

    #[error("degenerate metric `{0}`: denominator is near zero")]
    NumericDegenerate(&'static str),

    #[error("invalid predictor weights: {0}")]
    InvalidWeights(String),

    #[error(transparent)]
    Operator(#[from] anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EvalError {
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EvalError::DimensionMismatch { .. }
                | EvalError::ChannelMismatch { .. }
                | EvalError::ShapeMismatch { .. }
                | EvalError::RegionCountMismatch { .. }
                | EvalError::MissingDependency { .. }
                | EvalError::EmptyRegions(_)
                | EvalError::UnknownMetric(_)
        )
    }
}
