use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Events emitted by the helper for host code to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionEvent {
    /// Steam login and the GC handshake have both completed, operations can
    /// be issued.
    Ready,
}

/// Tracks the two preconditions for talking to the game coordinator.
///
/// Both flags start out false and are flipped by the login task. They are
/// never reset, there is no disconnect handling.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    logged_in: AtomicBool,
    gc_connected: AtomicBool,
}

impl SessionState {
    pub fn set_logged_in(&self) {
        self.logged_in.store(true, Ordering::SeqCst);
    }

    pub fn set_gc_connected(&self) {
        self.gc_connected.store(true, Ordering::SeqCst);
    }

    /// Whether operations may be issued, logging which precondition is
    /// missing when they may not.
    pub fn is_ready(&self) -> bool {
        let logged_in = self.logged_in.load(Ordering::SeqCst);
        let gc_connected = self.gc_connected.load(Ordering::SeqCst);
        if !logged_in {
            warn!("not logged in");
        } else if !gc_connected {
            warn!("no game coordinator session");
        }
        logged_in && gc_connected
    }
}
