//! Live transport lookup shared by a session's bridges.

use crate::transport::{RemoteTransport, TransportCapabilities};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

pub(crate) type TransportSlot = Arc<Mutex<Option<Box<dyn RemoteTransport>>>>;

/// Weak handle to a session's current transport.
///
/// Every call re-reads the slot, so a bridge holding this never sees a
/// transport the session has already released. The slot lock is held only
/// for the synchronous transport call.
#[derive(Clone, Default)]
pub struct LiveTransport {
    slot: Weak<Mutex<Option<Box<dyn RemoteTransport>>>>,
}

impl LiveTransport {
    pub(crate) fn new(slot: &TransportSlot) -> Self {
        Self {
            slot: Arc::downgrade(slot),
        }
    }

    /// A handle that never resolves to a transport
    pub fn detached() -> Self {
        Self::default()
    }

    /// Run `f` against the live transport, if there is one
    pub fn with<R>(&self, f: impl FnOnce(&dyn RemoteTransport) -> R) -> Option<R> {
        let slot = self.slot.upgrade()?;
        let guard = slot.lock();
        let transport: &dyn RemoteTransport = guard.as_deref()?;
        Some(f(transport))
    }

    pub fn is_live(&self) -> bool {
        self.with(|_| ()).is_some()
    }

    pub fn capabilities(&self) -> Option<TransportCapabilities> {
        self.with(|t| t.capabilities())
    }
}

impl std::fmt::Debug for LiveTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveTransport")
            .field("live", &self.is_live())
            .finish()
    }
}
