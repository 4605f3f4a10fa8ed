use std::sync::Arc;

use crate::{DisplayControl, PowerControl, ProcessRegistry, SessionSignal, WindowSystem};

/// Bundle of the platform primitives a session runs against.
///
/// Platform crates construct one of these; the orchestration layer only
/// ever sees the trait objects.
#[derive(Clone)]
pub struct Platform {
    pub display: Arc<dyn DisplayControl>,
    pub processes: Arc<dyn ProcessRegistry>,
    pub windows: Arc<dyn WindowSystem>,
    pub signal: Arc<dyn SessionSignal>,
    pub power: Arc<dyn PowerControl>,
}

impl Platform {
    pub fn new(
        display: Arc<dyn DisplayControl>,
        processes: Arc<dyn ProcessRegistry>,
        windows: Arc<dyn WindowSystem>,
        signal: Arc<dyn SessionSignal>,
        power: Arc<dyn PowerControl>,
    ) -> Self {
        Self {
            display,
            processes,
            windows,
            signal,
            power,
        }
    }
}
