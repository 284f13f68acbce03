use std::{fmt, sync::Arc};

use crate::{
    error::{MetricError, RenderError},
    metric::{CacheMetric, CallbackMetric, CallbackValue, CounterMetric, DistributionMetric, Metric},
    registry::Registry,
};

/// Convert a dotted package-style name into an exposition-safe name prefix.
///
/// `.` is reserved in the exposition format, so every `.` becomes `_`. No other validation is
/// performed; names are validated when a metric is built from the prefix.
///
/// # Examples
/// ```
/// use vitals_core::namespace_prefix;
///
/// assert_eq!(namespace_prefix("synapse.storage"), "synapse_storage");
/// assert_eq!(namespace_prefix("plain"), "plain");
/// ```
#[inline]
pub fn namespace_prefix(dotted_name: &str) -> String {
    dotted_name.replace('.', "_")
}

/// Prefix-bearing handle used to register metrics into a [`Registry`].
///
/// Handles are not stored anywhere; creating several for the same prefix is fine.
/// Every metric registered through a handle is named `"{prefix}_{local_name}"`.
#[derive(Clone)]
pub struct Namespace {
    prefix: String,
    registry: Arc<Registry>,
}

impl Namespace {
    pub(crate) fn new(dotted_name: &str, registry: Arc<Registry>) -> Self {
        Self {
            prefix: namespace_prefix(dotted_name),
            registry,
        }
    }

    /// Name prefix shared by all metrics registered through this handle.
    #[inline]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Fully-qualified name for `local_name` under this namespace.
    #[inline]
    pub fn full_name(&self, local_name: &str) -> String {
        format!("{}_{}", self.prefix, local_name)
    }

    /// Register a counter, replacing any metric with the same full name.
    pub fn register_counter(
        &self,
        local_name: &str,
        labels: &[&str],
    ) -> Result<Arc<CounterMetric>, MetricError> {
        self.register(local_name, |name| CounterMetric::new(name, labels), Metric::Counter)
    }

    /// Register a callback metric, replacing any metric with the same full name.
    pub fn register_callback<F>(
        &self,
        local_name: &str,
        labels: &[&str],
        callback: F,
    ) -> Result<Arc<CallbackMetric>, MetricError>
    where
        F: Fn() -> Result<CallbackValue, RenderError> + Send + Sync + 'static,
    {
        self.register(
            local_name,
            |name| CallbackMetric::new(name, labels, callback),
            Metric::Callback,
        )
    }

    /// Register a distribution, replacing any metric with the same full name.
    pub fn register_distribution(
        &self,
        local_name: &str,
        labels: &[&str],
    ) -> Result<Arc<DistributionMetric>, MetricError> {
        self.register(
            local_name,
            |name| DistributionMetric::new(name, labels),
            Metric::Distribution,
        )
    }

    /// Register a cache metric, replacing any metric with the same full name.
    pub fn register_cache<F>(
        &self,
        local_name: &str,
        size_callback: F,
    ) -> Result<Arc<CacheMetric>, MetricError>
    where
        F: Fn() -> u64 + Send + Sync + 'static,
    {
        self.register(
            local_name,
            |name| CacheMetric::new(name, size_callback),
            Metric::Cache,
        )
    }

    fn register<M>(
        &self,
        local_name: &str,
        build: impl FnOnce(String) -> Result<M, MetricError>,
        wrap: fn(Arc<M>) -> Metric,
    ) -> Result<Arc<M>, MetricError> {
        let metric = Arc::new(build(self.full_name(local_name))?);
        self.registry.insert(wrap(metric.clone()));
        Ok(metric)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("prefix", &self.prefix)
            .finish()
    }
}
