use async_trait::async_trait;

use crate::LaunchError;

/// Platform primitives for the cooperative session-end handshake.
///
/// The launcher side holds a well-known named synchronization primitive for
/// the lifetime of its session (a named mutex on Windows, an exclusive file
/// lock on Unix) and releases it when the session ends.
#[async_trait]
pub trait SessionSignal: Send + Sync {
    /// Try to open the named primitive. `None` means it does not exist yet,
    /// i.e. the launcher has not created it.
    async fn try_open(&self, name: &str) -> Result<Option<Box<dyn SignalWaiter>>, LaunchError>;
}

/// A single indefinite wait on an opened session primitive.
#[async_trait]
pub trait SignalWaiter: Send {
    /// Block until the holder releases the primitive, then release and
    /// close it on this side as well. Consumes the waiter; there is no
    /// second wait.
    async fn wait_released(self: Box<Self>) -> Result<(), LaunchError>;
}

/// Platform primitive for the optional sleep-on-exit action.
#[async_trait]
pub trait PowerControl: Send + Sync {
    /// Put the machine to sleep. Best-effort.
    async fn suspend(&self) -> Result<(), LaunchError>;
}
