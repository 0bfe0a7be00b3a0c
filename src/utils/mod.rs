//! Utility module: errors, logging, metrics, and serde helpers.

pub mod errors;
pub mod logging;
pub mod metrics;
pub mod serde_helpers;

pub use errors::{
    CapabilityError, ConfigError, PipelineError, PipelineStage, ProviderError, Result,
    TransportError,
};
pub use logging::init_logging;
pub use metrics::{MetricsRegistry, METRICS};
