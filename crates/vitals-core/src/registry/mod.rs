//! Process-wide metric registry and the text exposition renderer.
//!
//! The registry maps fully-qualified metric names to [`Metric`]s. Registration is an upsert:
//! registering under a name that already exists replaces the earlier metric.
//!
//! [`Registry::render_all`] produces one exposition document. Passes are serialized; each one:
//! 1. refreshes the [`ResourceSnapshot`] (fail-fast);
//! 2. renders every metric in ascending name order;
//! 3. replaces the output of a failing metric with `# FAILED to render <name>`;
//! 4. terminates the document with a newline.
use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use tracing::{debug, error};

use crate::{
    error::ResourceError,
    metric::{Metric, RenderMetric},
    resource::{self, PROCESS_RESOURCE_NAMESPACE, ResourceSnapshot},
};

mod namespace;
pub use namespace::{Namespace, namespace_prefix};

static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

/// Prefix of the placeholder line emitted for a metric that failed to render.
pub const FAILED_RENDER_PREFIX: &str = "# FAILED to render ";

/// Mapping from fully-qualified metric name to metric, plus the resource snapshot read by the
/// built-in `process_resource_*` callbacks.
pub struct Registry {
    metrics: RwLock<BTreeMap<String, Metric>>,
    snapshot: Arc<ResourceSnapshot>,
    // Held from the snapshot refresh to the last rendered metric.
    render_lock: Mutex<()>,
}

impl Registry {
    /// Create a registry with the built-in process resource metrics registered.
    ///
    /// Applications should create one of these at startup and share it; see also [`Registry::global`].
    pub fn new() -> Arc<Self> {
        Self::with_snapshot(Arc::new(ResourceSnapshot::new()))
    }

    /// Create a registry with process resource metrics reading from the given snapshot.
    pub fn with_snapshot(snapshot: Arc<ResourceSnapshot>) -> Arc<Self> {
        let registry = Self::empty(snapshot);

        let ns = registry.namespace_for(PROCESS_RESOURCE_NAMESPACE);
        // Built-in names are constants, checked by `built_in_metric_names_are_valid`.
        resource::register_process_metrics(&ns, &registry.snapshot)
            .expect("built-in process metric names are valid");
        registry
    }

    /// Create a registry without any pre-registered metrics.
    pub fn without_process_metrics() -> Arc<Self> {
        Self::empty(Arc::new(ResourceSnapshot::new()))
    }

    fn empty(snapshot: Arc<ResourceSnapshot>) -> Arc<Self> {
        Arc::new(Self {
            metrics: RwLock::new(BTreeMap::new()),
            snapshot,
            render_lock: Mutex::new(()),
        })
    }

    /// Lazily created process-wide registry.
    pub fn global() -> &'static Arc<Registry> {
        GLOBAL.get_or_init(Registry::new)
    }

    /// Get a handle for registering metrics under `dotted_name` (dots become underscores).
    pub fn namespace_for(self: &Arc<Self>, dotted_name: &str) -> Namespace {
        Namespace::new(dotted_name, self.clone())
    }

    /// Insert a metric under its own name, returning the one it replaced.
    pub fn insert(&self, metric: Metric) -> Option<Metric> {
        let name = metric.name().to_string();
        let kind = metric.kind();

        let replaced = self.write().insert(name.clone(), metric);
        match &replaced {
            Some(old) => debug!(
                metric = %name,
                kind,
                replaced_kind = old.kind(),
                "metric registered, replacing existing entry"
            ),
            None => debug!(metric = %name, kind, "metric registered"),
        }
        replaced
    }

    /// Get a registered metric by fully-qualified name.
    pub fn get(&self, name: &str) -> Option<Metric> {
        self.read().get(name).cloned()
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// All registered names in ascending order.
    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot slot refreshed at the start of every render pass.
    pub fn resource_snapshot(&self) -> &Arc<ResourceSnapshot> {
        &self.snapshot
    }

    /// Render every registered metric into one exposition-format document.
    ///
    /// A metric whose render fails contributes a single `# FAILED to render <name>` line and an
    /// error log record; the other metrics are unaffected. A failing resource refresh aborts the
    /// whole pass.
    ///
    /// Concurrent calls run one after another, so every pass reports its own resource reading.
    /// Metric callbacks must not wait on another `render_all` call.
    pub fn render_all(&self) -> Result<String, ResourceError> {
        let _pass = self
            .render_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        self.snapshot.refresh()?;

        // Clone the entries so metric callbacks run without holding the registry lock.
        let entries: Vec<(String, Metric)> = self
            .read()
            .iter()
            .map(|(name, metric)| (name.clone(), metric.clone()))
            .collect();

        let mut lines: Vec<String> = Vec::new();
        for (name, metric) in entries {
            match metric.render() {
                Ok(rendered) => lines.extend(rendered),
                Err(e) => {
                    error!(metric = %name, kind = metric.kind(), error = %e, "failed to render metric");
                    lines.push(format!("{FAILED_RENDER_PREFIX}{name}"));
                }
            }
        }

        let mut out = lines.join("\n");
        out.push('\n');
        Ok(out)
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Metric>> {
        self.metrics
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Metric>> {
        self.metrics
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("metrics", &self.len())
            .field("page_size", &self.snapshot.page_size())
            .finish()
    }
}
