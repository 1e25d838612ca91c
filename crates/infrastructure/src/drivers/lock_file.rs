use domain::DomainError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exclusive lock on a bus shared between drivers, held as a file on disk.
///
/// A lock still present after `timeout` is considered stale and broken.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
    timeout: Duration,
    held: bool,
}

impl LockFile {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
            held: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub async fn acquire(&mut self) -> Result<(), DomainError> {
        if self.held {
            return Ok(());
        }

        let started = Instant::now();
        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.path)
                .await
            {
                Ok(mut file) => {
                    let pid = std::process::id().to_string();
                    file.write_all(pid.as_bytes())
                        .await
                        .map_err(|e| self.io_error("write", e))?;
                    self.held = true;
                    debug!(path = %self.path.display(), "Lock acquired");
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if started.elapsed() >= self.timeout {
                        warn!(
                            path = %self.path.display(),
                            waited_ms = started.elapsed().as_millis() as u64,
                            "Breaking stale lock"
                        );
                        fs::remove_file(&self.path)
                            .await
                            .or_else(ignore_missing)
                            .map_err(|e| self.io_error("break", e))?;
                        continue;
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(e) => return Err(self.io_error("create", e)),
            }
        }
    }

    pub async fn release(&mut self) -> Result<(), DomainError> {
        if !self.held {
            return Ok(());
        }

        fs::remove_file(&self.path)
            .await
            .or_else(ignore_missing)
            .map_err(|e| self.io_error("remove", e))?;
        self.held = false;
        debug!(path = %self.path.display(), "Lock released");
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn mark_held(&mut self) {
        self.held = true;
    }

    fn io_error(&self, action: &str, e: std::io::Error) -> DomainError {
        DomainError::Driver(format!(
            "Failed to {} lock file {}: {}",
            action,
            self.path.display(),
            e
        ))
    }
}

fn ignore_missing(e: std::io::Error) -> std::io::Result<()> {
    if e.kind() == ErrorKind::NotFound {
        Ok(())
    } else {
        Err(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_lock() -> PathBuf {
        std::env::temp_dir().join(format!("output-{}.lock", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let path = temp_lock();
        let mut lock = LockFile::new(&path, Duration::from_secs(1));

        lock.acquire().await.unwrap();
        assert!(lock.is_held());
        assert!(path.exists());

        lock.release().await.unwrap();
        assert!(!lock.is_held());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_stale_lock_is_broken_after_timeout() {
        let path = temp_lock();
        std::fs::write(&path, "4242").unwrap();

        let mut lock = LockFile::new(&path, Duration::from_millis(100));
        lock.acquire().await.unwrap();

        assert!(lock.is_held());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            std::process::id().to_string()
        );
        lock.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_release_without_acquire_is_noop() {
        let mut lock = LockFile::new(temp_lock(), Duration::from_secs(1));
        tokio_test::assert_ok!(lock.release().await);
    }
}
