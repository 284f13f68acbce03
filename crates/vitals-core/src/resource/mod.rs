//! Self-measurement of process resource usage.
//!
//! ## Overview
//!
//! [`ResourceSnapshot`] holds the most recent `getrusage(RUSAGE_SELF)` reading plus the OS page
//! size captured once at construction. Only the registry's render pass refreshes it, and render
//! passes are serialized, so all `process_resource_*` callbacks rendered in one pass report the
//! same instant.
//!
//! - On **Unix platforms** the reading comes from `libc::getrusage`; a failing call is returned
//!   as [`ResourceError`] and aborts the render pass.
//! - On **non-Unix platforms** there is no equivalent; the refresh logs a warning and stores a
//!   zeroed reading so rendering still works.
use std::sync::{Arc, RwLock};

use tracing::trace;

use crate::{
    error::{MetricError, RenderError, ResourceError},
    registry::Namespace,
};

/// Namespace under which the built-in resource callbacks are registered.
pub const PROCESS_RESOURCE_NAMESPACE: &str = "process.resource";

/// Local names of the built-in resource callbacks.
pub const PROCESS_RESOURCE_METRICS: [&str; 3] = ["utime", "stime", "maxrss"];

/// Page size used when the OS does not report one.
pub const FALLBACK_PAGE_SIZE: u64 = 4096;

/// Function queried by [`ResourceSnapshot`] on every refresh.
pub type UsageSource = fn() -> Result<ResourceUsage, ResourceError>;

/// One OS-reported resource usage reading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceUsage {
    /// User CPU time in seconds.
    pub utime_secs: f64,
    /// System CPU time in seconds.
    pub stime_secs: f64,
    /// Peak resident set size, in the unit reported by the OS.
    pub maxrss: i64,
}

/// Shared, lock-guarded slot with the latest [`ResourceUsage`].
#[derive(Debug)]
pub struct ResourceSnapshot {
    latest: RwLock<Option<ResourceUsage>>,
    page_size: u64,
    source: UsageSource,
}

impl Default for ResourceSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSnapshot {
    /// Create an empty snapshot, capturing the OS page size.
    pub fn new() -> Self {
        Self::with_page_size(page_size())
    }

    /// Create an empty snapshot with an explicit page size.
    pub fn with_page_size(page_size: u64) -> Self {
        Self::with_source(page_size, query_usage)
    }

    /// Create an empty snapshot reading from `source` instead of the OS.
    pub fn with_source(page_size: u64, source: UsageSource) -> Self {
        Self {
            latest: RwLock::new(None),
            page_size,
            source,
        }
    }

    /// Query the usage source and overwrite the stored reading.
    ///
    /// On error the previous reading is kept.
    pub(crate) fn refresh(&self) -> Result<ResourceUsage, ResourceError> {
        let usage = (self.source)()?;
        trace!(?usage, "resource snapshot refreshed");
        self.store(usage);
        Ok(usage)
    }

    pub(crate) fn store(&self, usage: ResourceUsage) {
        let mut guard = self
            .latest
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(usage);
    }

    /// Most recent reading, if any refresh happened.
    pub fn latest(&self) -> Option<ResourceUsage> {
        match self.latest.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    #[inline]
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// User CPU time in milliseconds.
    pub fn utime_ms(&self) -> Result<f64, RenderError> {
        self.read(|u| u.utime_secs * 1000.0)
    }

    /// System CPU time in milliseconds.
    pub fn stime_ms(&self) -> Result<f64, RenderError> {
        self.read(|u| u.stime_secs * 1000.0)
    }

    /// Peak resident set size multiplied by the page size.
    pub fn maxrss_bytes(&self) -> Result<u64, RenderError> {
        self.read(|u| (u.maxrss.max(0) as u64).saturating_mul(self.page_size))
    }

    fn read<T>(&self, f: impl FnOnce(&ResourceUsage) -> T) -> Result<T, RenderError> {
        self.latest()
            .as_ref()
            .map(f)
            .ok_or(RenderError::SnapshotMissing)
    }
}

/// Register the `utime`, `stime` and `maxrss` callbacks reading from `snapshot`.
pub(crate) fn register_process_metrics(
    ns: &Namespace,
    snapshot: &Arc<ResourceSnapshot>,
) -> Result<(), MetricError> {
    let [utime, stime, maxrss] = PROCESS_RESOURCE_METRICS;

    let s = snapshot.clone();
    ns.register_callback(utime, &[], move || Ok(s.utime_ms()?.into()))?;

    let s = snapshot.clone();
    ns.register_callback(stime, &[], move || Ok(s.stime_ms()?.into()))?;

    let s = snapshot.clone();
    ns.register_callback(maxrss, &[], move || Ok(s.maxrss_bytes()?.into()))?;

    Ok(())
}

#[cfg(unix)]
fn query_usage() -> Result<ResourceUsage, ResourceError> {
    unix_impl::getrusage_self()
}

#[cfg(not(unix))]
fn query_usage() -> Result<ResourceUsage, ResourceError> {
    tracing::warn!("process resource usage is not available on this OS; reporting zeroes");
    Ok(ResourceUsage::default())
}

#[cfg(unix)]
fn page_size() -> u64 {
    unix_impl::page_size().unwrap_or(FALLBACK_PAGE_SIZE)
}

#[cfg(not(unix))]
fn page_size() -> u64 {
    FALLBACK_PAGE_SIZE
}

#[cfg(unix)]
mod unix_impl {
    use std::{io, mem::MaybeUninit};

    use super::ResourceUsage;
    use crate::error::ResourceError;

    pub fn getrusage_self() -> Result<ResourceUsage, ResourceError> {
        let mut raw = MaybeUninit::<libc::rusage>::zeroed();

        let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, raw.as_mut_ptr()) };
        if rc != 0 {
            return Err(ResourceError::Getrusage(io::Error::last_os_error()));
        }
        let raw = unsafe { raw.assume_init() };

        Ok(ResourceUsage {
            utime_secs: timeval_secs(&raw.ru_utime),
            stime_secs: timeval_secs(&raw.ru_stime),
            maxrss: raw.ru_maxrss as i64,
        })
    }

    pub fn page_size() -> Option<u64> {
        let n = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        (n > 0).then_some(n as u64)
    }

    #[inline]
    fn timeval_secs(tv: &libc::timeval) -> f64 {
        tv.tv_sec as f64 + tv.tv_usec as f64 / 1_000_000.0
    }
}
