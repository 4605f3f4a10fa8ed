use std::fs::File;
use std::path::PathBuf;

use async_trait::async_trait;
use nix::fcntl::{Flock, FlockArg};
use tracing::{debug, info};

use gslaunch_core::{LaunchError, SessionSignal, SignalWaiter};

/// Session handshake over an exclusive lock on a well-known file.
///
/// The launcher side creates `<tmp>/<name>.lock` and holds an exclusive
/// flock on it for the session; releasing the lock (or exiting) signals
/// completion.
pub struct FileLockSessionSignal {
    base: PathBuf,
}

impl FileLockSessionSignal {
    pub fn new() -> Self {
        Self {
            base: std::env::temp_dir(),
        }
    }

    fn lock_path(&self, name: &str) -> PathBuf {
        self.base.join(format!("{name}.lock"))
    }
}

impl Default for FileLockSessionSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionSignal for FileLockSessionSignal {
    async fn try_open(&self, name: &str) -> Result<Option<Box<dyn SignalWaiter>>, LaunchError> {
        let path = self.lock_path(name);
        if !path.exists() {
            return Ok(None);
        }
        debug!(path = %path.display(), "session lock file present");
        Ok(Some(Box::new(FileLockWaiter { path })))
    }
}

struct FileLockWaiter {
    path: PathBuf,
}

#[async_trait]
impl SignalWaiter for FileLockWaiter {
    async fn wait_released(self: Box<Self>) -> Result<(), LaunchError> {
        let path = self.path;
        info!(path = %path.display(), "waiting for session lock to be released");
        tokio::task::spawn_blocking(move || {
            let file = File::open(&path)?;
            // Blocks until the launcher drops its exclusive lock; dropping
            // the guard releases our side.
            let lock = Flock::lock(file, FlockArg::LockExclusive)
                .map_err(|(_, errno)| std::io::Error::from(errno))?;
            drop(lock);
            Ok::<_, std::io::Error>(())
        })
        .await
        .map_err(|err| LaunchError::Other(anyhow::anyhow!("lock wait task failed: {err}")))??;
        Ok(())
    }
}
