pub mod derive;
pub mod registry;
pub mod report;
pub mod snapshot;

pub use registry::{MetricKey, OperatorRegistry};
pub use snapshot::{MetricsSnapshot, SnapshotBuilder};
