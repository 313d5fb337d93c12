// Library exports for the remote session layer and its tests
//
// # Locking
//
// Session, viewport, input and clipboard state sit behind `parking_lot::Mutex`.
// Locks are held only for synchronous work and never across an `.await`.
// Host trait calls and render-surface callbacks are made with no lock held;
// the one exception is the transport slot, locked for the duration of a
// synchronous `RemoteTransport` call.

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[macro_use]
pub mod debug;

pub mod cli;
pub mod clipboard;
pub mod host;
pub mod input;
pub mod preview;
pub mod registry;
pub mod session;
pub mod transport;
pub mod viewport;

pub use par_remote_config::Config;
pub use registry::{RegistryError, SessionRegistry};
pub use session::{
    ConnectionParams, ConnectionRoute, ProtocolKind, Session, SessionError, SessionId,
    SessionStatus,
};
