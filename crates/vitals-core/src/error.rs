use thiserror::Error;

/// Errors raised while constructing or driving a metric.
#[derive(Debug, Error)]
pub enum MetricError {
    #[error("invalid metric name: '{0}'")]
    InvalidName(String),

    #[error("invalid label name '{label}' for metric '{metric}'")]
    InvalidLabelName { metric: String, label: String },

    #[error("duplicate label name '{label}' for metric '{metric}'")]
    DuplicateLabel { metric: String, label: String },

    #[error("metric '{metric}' expects {expected} label values, got {actual}")]
    LabelArity {
        metric: String,
        expected: usize,
        actual: usize,
    },
}

/// Errors raised by a single metric during a render pass.
///
/// These never abort the pass: the renderer replaces the metric's output with a failure line.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("callback failed: {0}")]
    Callback(String),

    #[error("expected {expected} label values, got {actual}")]
    LabelArity { expected: usize, actual: usize },

    #[error("resource snapshot has not been refreshed yet")]
    SnapshotMissing,
}

/// Errors raised while querying the OS for process resource usage.
///
/// Unlike [`RenderError`], this aborts the whole render pass.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("getrusage failed: {0}")]
    Getrusage(#[from] std::io::Error),
}
