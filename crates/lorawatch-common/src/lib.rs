mod metrics;

pub use metrics::{export_metrics, Metrics};
pub use prometheus::Registry;
