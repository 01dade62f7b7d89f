use crate::CoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Exclusive advisory lock held for the duration of a provisioning run.
///
/// Loop-device allocation and the shared mountpoint assume a single writer, so
/// a second run fails fast instead of waiting.
pub struct RunLock {
    lock_file: File,
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(lock_path: &Path) -> Result<Self, CoreError> {
        Self::try_acquire(lock_path)?.ok_or_else(|| {
            CoreError::Lock(format!(
                "another poolswap run holds {}",
                lock_path.display()
            ))
        })
    }

    pub fn try_acquire(lock_path: &Path) -> Result<Option<Self>, CoreError> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(lock_path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                lock_file: file,
                path: lock_path.to_path_buf(),
            })),
            Err(_) => Ok(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
    }
}
