pub mod congestion;
pub mod metrics;
