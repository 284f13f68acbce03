use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{
    error::{MetricError, RenderError},
    metric::{RenderMetric, labels},
};

/// Boxed callback reporting the current number of cache entries.
pub type SizeCallback = Box<dyn Fn() -> u64 + Send + Sync>;

/// Hit/miss counters for a cache, plus its current size.
///
/// Rendered as `<name>:hits`, `<name>:total` (hits + misses) and `<name>:size`.
pub struct CacheMetric {
    name: String,
    hits: AtomicU64,
    misses: AtomicU64,
    size: SizeCallback,
}

impl CacheMetric {
    /// Create a cache metric with the given fully-qualified name and size callback.
    pub fn new<F>(name: impl Into<String>, size_callback: F) -> Result<Self, MetricError>
    where
        F: Fn() -> u64 + Send + Sync + 'static,
    {
        let name = name.into();
        labels::validate(&name, &[])?;

        Ok(Self {
            name,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            size: Box::new(size_callback),
        })
    }

    #[inline]
    pub fn inc_hits(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_misses(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Total lookups (hits + misses).
    pub fn total(&self) -> u64 {
        self.hits().saturating_add(self.misses.load(Ordering::Relaxed))
    }
}

impl RenderMetric for CacheMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self) -> Result<Vec<String>, RenderError> {
        let hits = self.hits();
        let total = self.total();
        let size = (self.size)();

        Ok(vec![
            format!("{}:hits {}", self.name, hits),
            format!("{}:total {}", self.name, total),
            format!("{}:size {}", self.name, size),
        ])
    }
}

impl fmt::Debug for CacheMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheMetric")
            .field("name", &self.name)
            .field("hits", &self.hits())
            .field("total", &self.total())
            .finish()
    }
}
