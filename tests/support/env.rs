use std::ffi::OsString;
use std::path::Path;
use std::sync::{LazyLock, Mutex, MutexGuard};

use pathosynth::app_dirs::CONFIG_HOME_ENV;
use tempfile::TempDir;

/// Serializes every test that touches the process environment.
static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// A throwaway config home, exported through `PATHOSYNTH_CONFIG_HOME` until dropped.
pub struct TempConfigHome {
    dir: TempDir,
    previous: Option<OsString>,
    _lock: MutexGuard<'static, ()>,
}

impl TempConfigHome {
    pub fn new() -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        let dir = tempfile::tempdir().expect("create config home");
        let previous = std::env::var_os(CONFIG_HOME_ENV);
        // SAFETY: ENV_LOCK is held for the guard's lifetime.
        unsafe { std::env::set_var(CONFIG_HOME_ENV, dir.path()) };
        Self {
            dir,
            previous,
            _lock: lock,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Drop for TempConfigHome {
    fn drop(&mut self) {
        // SAFETY: ENV_LOCK is still held; it is released after this body runs.
        unsafe {
            match self.previous.take() {
                Some(value) => std::env::set_var(CONFIG_HOME_ENV, value),
                None => std::env::remove_var(CONFIG_HOME_ENV),
            }
        }
    }
}
