//! Metric variants that can be stored in the [`crate::Registry`].
//!
//! Every variant implements [`RenderMetric`]: given its current state it produces zero or more
//! exposition lines. The registry stores them behind the closed [`Metric`] enum.
use std::sync::Arc;

use crate::error::RenderError;

pub mod labels;

mod cache;
pub use cache::{CacheMetric, SizeCallback};

mod callback;
pub use callback::{Callback, CallbackMetric, CallbackValue};

mod counter;
pub use counter::CounterMetric;

mod distribution;
pub use distribution::DistributionMetric;

/// Render contract shared by all metric variants.
pub trait RenderMetric: Send + Sync + 'static {
    /// Fully-qualified metric name.
    fn name(&self) -> &str;
    /// Render current state to exposition lines.
    ///
    /// An empty vector is a valid result; absence of data must not be an error.
    fn render(&self) -> Result<Vec<String>, RenderError>;
}

/// A registered metric of one of the four supported kinds.
#[derive(Debug, Clone)]
pub enum Metric {
    Counter(Arc<CounterMetric>),
    Callback(Arc<CallbackMetric>),
    Distribution(Arc<DistributionMetric>),
    Cache(Arc<CacheMetric>),
}

impl Metric {
    /// Return kind label for logs.
    #[inline]
    pub fn kind(&self) -> &'static str {
        match self {
            Metric::Counter(_) => "counter",
            Metric::Callback(_) => "callback",
            Metric::Distribution(_) => "distribution",
            Metric::Cache(_) => "cache",
        }
    }

    #[inline]
    fn inner(&self) -> &dyn RenderMetric {
        match self {
            Metric::Counter(m) => &**m,
            Metric::Callback(m) => &**m,
            Metric::Distribution(m) => &**m,
            Metric::Cache(m) => &**m,
        }
    }
}

impl RenderMetric for Metric {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn render(&self) -> Result<Vec<String>, RenderError> {
        self.inner().render()
    }
}

/// Format a sample value the way the text exposition format expects.
pub(crate) fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        v.to_string()
    }
}
