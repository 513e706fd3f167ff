//! Temporary target lifetime tracking
//!
//! Mirrors what a GPU backend would do with the allocate/release commands
//! the renderer records, and reports every misuse instead of crashing:
//! double allocation, release of a target that is not live, reads of a
//! target that is not live and targets still live when a camera submits.

use std::collections::BTreeMap;

use lumen_render::{ShaderId, TemporaryTargetDesc};
use serde::Serialize;
use thiserror::Error;

/// Errors reported by the headless host
#[derive(Debug, Error)]
pub enum HeadlessError {
    #[error("temporary target {0:?} allocated while already live")]
    DoubleAllocation(ShaderId),

    #[error("temporary target {0:?} released while not live")]
    DoubleRelease(ShaderId),

    #[error("temporary target {0:?} used while not live")]
    NotLive(ShaderId),

    #[error("temporary target {0:?} still live at submit")]
    LeakedAtSubmit(ShaderId),

    #[error("Scene parse error: {0}")]
    SceneParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for headless host operations
pub type HeadlessResult<T> = Result<T, HeadlessError>;

/// Tracker statistics
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TrackerStats {
    pub total_allocations: u64,
    pub total_releases: u64,
    /// Bytes of the targets currently live
    pub live_bytes: u64,
    /// Largest `live_bytes` seen
    pub peak_bytes: u64,
}

/// Live temporary targets of the current camera
#[derive(Clone, Debug, Default)]
pub struct TargetTracker {
    live: BTreeMap<ShaderId, TemporaryTargetDesc>,
    stats: TrackerStats,
}

impl TargetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, id: ShaderId, desc: TemporaryTargetDesc) -> HeadlessResult<()> {
        if self.live.contains_key(&id) {
            return Err(HeadlessError::DoubleAllocation(id));
        }
        self.live.insert(id, desc);
        self.stats.total_allocations += 1;
        self.stats.live_bytes += desc.estimated_bytes();
        self.stats.peak_bytes = self.stats.peak_bytes.max(self.stats.live_bytes);
        Ok(())
    }

    pub fn release(&mut self, id: ShaderId) -> HeadlessResult<()> {
        let desc = self.live.remove(&id).ok_or(HeadlessError::DoubleRelease(id))?;
        self.stats.total_releases += 1;
        self.stats.live_bytes -= desc.estimated_bytes();
        Ok(())
    }

    /// Fail if `id` is not live
    pub fn check_live(&self, id: ShaderId) -> HeadlessResult<()> {
        if self.live.contains_key(&id) {
            Ok(())
        } else {
            Err(HeadlessError::NotLive(id))
        }
    }

    /// Drop everything still live and report it as leaked
    pub fn drain_leaks(&mut self) -> Vec<HeadlessError> {
        let leaked = std::mem::take(&mut self.live);
        self.stats.live_bytes = 0;
        leaked
            .into_keys()
            .map(HeadlessError::LeakedAtSubmit)
            .collect()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Description of a live target
    pub fn desc(&self, id: ShaderId) -> Option<&TemporaryTargetDesc> {
        self.live.get(&id)
    }

    pub fn stats(&self) -> &TrackerStats {
        &self.stats
    }
}
