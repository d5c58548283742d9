use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;

use crate::error::HarnessError;

// The current directory is process-wide; guards take turns holding it.
static CWD_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

thread_local! {
    static GUARD_HELD: Cell<bool> = const { Cell::new(false) };
}

/// Scoped change of the process working directory.
///
/// The original directory is restored when the guard is dropped, on every
/// exit path including early returns and panics.
///
/// Guards do not nest: while one is alive, entering another from the same
/// thread fails with [`HarnessError::NestedWorkingDirectory`], and one from
/// another thread waits until the first is dropped.
pub struct WorkingDirectory {
    original: PathBuf,
    current: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl WorkingDirectory {
    /// Change into `dir`, remembering where to return to.
    ///
    /// Returns [`HarnessError::NestedWorkingDirectory`] if this thread already
    /// holds a guard, since waiting on the lock would never finish.
    pub fn enter(dir: impl AsRef<Path>) -> Result<Self, HarnessError> {
        if GUARD_HELD.with(Cell::get) {
            return Err(HarnessError::NestedWorkingDirectory {
                dir: dir.as_ref().to_path_buf(),
            });
        }

        // A panic while another guard was held leaves the directory restored
        // by that guard's drop, so the poisoned lock is still usable.
        let lock = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let original = std::env::current_dir()?;
        std::env::set_current_dir(dir.as_ref())?;
        let current = std::env::current_dir().unwrap_or_else(|_| dir.as_ref().to_path_buf());
        log::debug!("entered {}", current.display());
        GUARD_HELD.with(|held| held.set(true));

        Ok(Self {
            original,
            current,
            _lock: lock,
        })
    }

    /// The directory the guard changed into.
    pub fn path(&self) -> &Path {
        &self.current
    }

    /// The directory restored on drop.
    pub fn original(&self) -> &Path {
        &self.original
    }
}

impl Drop for WorkingDirectory {
    fn drop(&mut self) {
        GUARD_HELD.with(|held| held.set(false));
        if let Err(e) = std::env::set_current_dir(&self.original) {
            log::error!(
                "failed to restore working directory {}: {e}",
                self.original.display()
            );
        }
    }
}
