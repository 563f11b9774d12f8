//! Connectivity pre-flight check.
//!
//! The real answer comes from the host OS (reachability APIs), which this
//! crate cannot call. The host implements [`NetworkProbe`] or flips a
//! [`FlagProbe`] from its connectivity listener.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Answers "could a connection attempt possibly succeed right now?".
pub trait NetworkProbe: Send + Sync + 'static {
    /// Synchronous, non-blocking reachability check.
    fn is_reachable(&self) -> bool;
}

/// A probe that always says yes. For hosts without a reachability API.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReachable;

impl NetworkProbe for AlwaysReachable {
    fn is_reachable(&self) -> bool {
        true
    }
}

/// A probe backed by a shared flag the host updates.
#[derive(Debug, Clone)]
pub struct FlagProbe {
    reachable: Arc<AtomicBool>,
}

impl FlagProbe {
    pub fn new(reachable: bool) -> Self {
        Self {
            reachable: Arc::new(AtomicBool::new(reachable)),
        }
    }

    pub fn set(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Relaxed);
    }
}

impl NetworkProbe for FlagProbe {
    fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::Relaxed)
    }
}
