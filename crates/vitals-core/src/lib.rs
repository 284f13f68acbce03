//! Process-wide metrics registry with a text exposition renderer.
//!
//! Subsystems obtain a [`Namespace`] from the shared [`Registry`] and register counters,
//! callbacks, distributions and cache metrics through it. A scraper calls
//! [`Registry::render_all`] to get the full document.
//!
//! ## Example
//! ```rust
//! use vitals_core::Registry;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Registry::new();
//!
//! let storage = registry.namespace_for("synapse.storage");
//! let events = storage.register_counter("events", &[])?;
//! events.inc(&[])?;
//!
//! let text = registry.render_all()?;
//! assert!(text.contains("synapse_storage_events 1\n"));
//! assert!(text.contains("process_resource_utime "));
//! # Ok(())
//! # }
//! ```
pub mod error;
pub mod metric;
pub mod registry;
pub mod resource;

pub use error::{MetricError, RenderError, ResourceError};
pub use metric::{
    CacheMetric, CallbackMetric, CallbackValue, CounterMetric, DistributionMetric, Metric,
    RenderMetric,
};
pub use registry::{FAILED_RENDER_PREFIX, Namespace, Registry, namespace_prefix};
pub use resource::{ResourceSnapshot, ResourceUsage};

pub mod prelude {
    pub use crate::error::{MetricError, RenderError, ResourceError};
    pub use crate::metric::{CallbackValue, RenderMetric};
    pub use crate::registry::{Namespace, Registry};
}
