//! Per-device scan job tracking.
//!
//! The tracker owns the asynchronous execution of scans: the triggering
//! call returns immediately, results surface only through the polled
//! snapshot, and at most one scan is in flight per device at any time.
//! State is volatile — a restart clears every job.

use std::sync::Arc;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::address_space::DiscoveredNode;
use crate::error::OpcuaError;

/// Lifecycle of one device's scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// No job recorded (the default for unknown devices).
    Idle,
    Scanning,
    Complete,
    Error,
}

impl ScanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// Snapshot of one device's scan state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanJob {
    pub status: ScanStatus,
    pub nodes: Vec<DiscoveredNode>,
    pub error: Option<String>,
    /// Unix timestamp of the last status change.
    pub updated_at: i64,
}

impl ScanJob {
    fn with_status(status: ScanStatus) -> Self {
        Self {
            status,
            nodes: Vec::new(),
            error: None,
            updated_at: Utc::now().timestamp(),
        }
    }

    fn idle() -> Self {
        Self::with_status(ScanStatus::Idle)
    }

    fn scanning() -> Self {
        Self::with_status(ScanStatus::Scanning)
    }

    fn complete(nodes: Vec<DiscoveredNode>) -> Self {
        Self {
            status: ScanStatus::Complete,
            nodes,
            error: None,
            updated_at: Utc::now().timestamp(),
        }
    }

    fn failed(message: String) -> Self {
        Self {
            status: ScanStatus::Error,
            nodes: Vec::new(),
            error: Some(message),
            updated_at: Utc::now().timestamp(),
        }
    }
}

/// Outcome of a trigger call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The job flipped to `scanning` and the scan was scheduled.
    Started,
    /// A scan is already in flight; nothing new was scheduled.
    AlreadyScanning,
}

/// Concurrent map of device id → scan job.
///
/// Cloning is cheap and shares the underlying map, so one tracker can be
/// handed to every admin-facing caller.
#[derive(Clone, Default)]
pub struct ScanJobTracker {
    jobs: Arc<DashMap<i64, ScanJob>>,
}

impl ScanJobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a scan of `target` for `device_id` on the blocking pool.
    /// Must be called from within a tokio runtime.
    #[cfg(feature = "client")]
    pub fn trigger(
        &self,
        device_id: i64,
        target: crate::session::EndpointTarget,
        identity: tagforge_core::ClientIdentity,
        max_depth: u32,
    ) -> TriggerOutcome {
        self.trigger_with(device_id, move || {
            crate::scan::scan(&target, &identity, max_depth)
        })
    }

    /// Schedule `scan_fn` as the device's scan. The status flips to
    /// `scanning` under the map entry before anything is spawned, so two
    /// racing triggers for one device can never both start work.
    pub fn trigger_with<F>(&self, device_id: i64, scan_fn: F) -> TriggerOutcome
    where
        F: FnOnce() -> Result<Vec<DiscoveredNode>, OpcuaError> + Send + 'static,
    {
        match self.jobs.entry(device_id) {
            Entry::Occupied(mut entry) => {
                if entry.get().status == ScanStatus::Scanning {
                    return TriggerOutcome::AlreadyScanning;
                }
                entry.insert(ScanJob::scanning());
            }
            Entry::Vacant(entry) => {
                entry.insert(ScanJob::scanning());
            }
        }

        let jobs = Arc::clone(&self.jobs);
        tokio::spawn(async move {
            let outcome = tokio::task::spawn_blocking(scan_fn).await;
            let job = match outcome {
                Ok(Ok(nodes)) => {
                    tracing::info!(
                        "scan for device {} found {} variables",
                        device_id,
                        nodes.len()
                    );
                    ScanJob::complete(nodes)
                }
                Ok(Err(err)) => {
                    tracing::warn!("scan for device {} failed: {}", device_id, err);
                    ScanJob::failed(err.to_string())
                }
                Err(join_err) => {
                    tracing::error!("scan task for device {} aborted: {}", device_id, join_err);
                    ScanJob::failed(format!("scan task aborted: {join_err}"))
                }
            };
            jobs.insert(device_id, job);
        });
        TriggerOutcome::Started
    }

    /// Current state without blocking; unknown devices read as idle.
    pub fn snapshot(&self, device_id: i64) -> ScanJob {
        self.jobs
            .get(&device_id)
            .map(|job| job.clone())
            .unwrap_or_else(ScanJob::idle)
    }

    /// Discard a device's cached job, returning it to implicit idle. The
    /// scan itself, if still running, is not signaled — its late result
    /// simply lands in a fresh entry.
    pub fn clear(&self, device_id: i64) -> bool {
        self.jobs.remove(&device_id).is_some()
    }
}
