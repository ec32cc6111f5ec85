//! One-shot credential hand-off through a named pipe
//!
//! pppd reads its CHAP secrets from a well-known file. Instead of writing
//! the password to disk we put a FIFO at that path, owned by us and closed
//! to everyone else, and write the secret line into it each time pppd opens
//! it. The FIFO is removed when the [`CredentialChannel`] guard drops.

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use std::fs::{self, File, OpenOptions, Permissions};
use std::future::Future;
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Owner read/write, nothing for group or other
const CHANNEL_MODE: u32 = 0o600;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Failed to remove stale {}: {source}", path.display())]
    Stale {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to create channel {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },
    #[error("Failed to restrict permissions on {}: {source}", path.display())]
    Permissions {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write to channel {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to check readers of {}: {source}", path.display())]
    Holders {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A FIFO that exists exactly as long as this guard
#[derive(Debug)]
pub struct CredentialChannel {
    path: PathBuf,
}

impl CredentialChannel {
    /// Create the FIFO at `path`, replacing whatever is there
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, ChannelError> {
        let path = path.into();

        match fs::symlink_metadata(&path) {
            Ok(_) => {
                fs::remove_file(&path).map_err(|source| ChannelError::Stale {
                    path: path.clone(),
                    source,
                })?;
                debug!("Removed stale {}", path.display());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(ChannelError::Stale { path, source }),
        }

        mkfifo(&path, Mode::S_IRUSR | Mode::S_IWUSR).map_err(|source| ChannelError::Create {
            path: path.clone(),
            source,
        })?;

        // From here on the guard owns the FIFO and removes it on any failure
        let channel = Self { path };
        fs::set_permissions(&channel.path, Permissions::from_mode(CHANNEL_MODE)).map_err(
            |source| ChannelError::Permissions {
                path: channel.path.clone(),
                source,
            },
        )?;

        debug!("Created credential channel {}", channel.path.display());
        Ok(channel)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CredentialChannel {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed credential channel {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

/// Answers whether any process still has a path open
pub trait HolderCheck {
    fn is_held(&self, path: &Path) -> impl Future<Output = io::Result<bool>> + Send;
}

/// Check backed by `lsof`, which exits 0 when it finds an open handle
#[derive(Debug, Clone, Copy, Default)]
pub struct Lsof;

impl HolderCheck for Lsof {
    async fn is_held(&self, path: &Path) -> io::Result<bool> {
        let status = Command::new("lsof")
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;
        Ok(status.success())
    }
}

/// Writes a secret record into a [`CredentialChannel`]
///
/// pppd opens the secrets file again when it retries authentication, so the
/// record is written `attempts` times. After each write the writer waits
/// until the reader has let go of the FIFO before offering it again.
#[derive(Debug, Clone)]
pub struct SecretWriter<P = Lsof> {
    attempts: u32,
    poll_interval: Duration,
    holders: P,
}

impl SecretWriter<Lsof> {
    pub fn new(attempts: u32, poll_interval: Duration) -> Self {
        Self::with_check(attempts, poll_interval, Lsof)
    }
}

impl<P: HolderCheck> SecretWriter<P> {
    pub fn with_check(attempts: u32, poll_interval: Duration, holders: P) -> Self {
        Self {
            attempts: attempts.max(1),
            poll_interval,
            holders,
        }
    }

    pub async fn deliver(&self, path: &Path, record: &str) -> Result<(), ChannelError> {
        for attempt in 1..=self.attempts {
            let mut pipe = self.open_for_writing(path).await?;
            pipe.write_all(record.as_bytes())
                .map_err(|source| ChannelError::Write {
                    path: path.to_path_buf(),
                    source,
                })?;
            drop(pipe);
            debug!(
                "Wrote credentials to {} ({}/{})",
                path.display(),
                attempt,
                self.attempts
            );

            while self.is_held(path).await? {
                warn!("{} still open", path.display());
                tokio::time::sleep(self.poll_interval).await;
            }
        }
        Ok(())
    }

    async fn is_held(&self, path: &Path) -> Result<bool, ChannelError> {
        self.holders
            .is_held(path)
            .await
            .map_err(|source| ChannelError::Holders {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Open the FIFO for writing once a reader is attached
    ///
    /// A non-blocking open fails with ENXIO while nobody reads, so this polls
    /// instead of parking a thread in `open(2)`.
    async fn open_for_writing(&self, path: &Path) -> Result<File, ChannelError> {
        loop {
            let opened = OpenOptions::new()
                .write(true)
                .custom_flags(OFlag::O_NONBLOCK.bits())
                .open(path);
            match opened {
                Ok(file) => return Ok(file),
                Err(e) if e.raw_os_error() == Some(Errno::ENXIO as i32) => {
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(source) => {
                    return Err(ChannelError::Write {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::os::unix::fs::FileTypeExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc, Mutex};
    use std::thread;
    use tempfile::TempDir;

    /// Reports the FIFO as held until the reader signals it closed its end
    struct ReaderGate {
        closed: Mutex<mpsc::Receiver<()>>,
        calls: Arc<AtomicUsize>,
    }

    impl HolderCheck for ReaderGate {
        async fn is_held(&self, _path: &Path) -> io::Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let closed = self.closed.lock().unwrap();
            Ok(closed.try_recv().is_err())
        }
    }

    #[test]
    fn test_acquire_creates_private_fifo() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("chap-secrets");

        let channel = CredentialChannel::acquire(&path).unwrap();

        let meta = fs::symlink_metadata(channel.path()).unwrap();
        assert!(meta.file_type().is_fifo());
        assert_eq!(meta.permissions().mode() & 0o777, CHANNEL_MODE);
        assert_eq!(meta.permissions().mode() & 0o077, 0);
    }

    #[test]
    fn test_drop_removes_fifo() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("chap-secrets");

        {
            let _channel = CredentialChannel::acquire(&path).unwrap();
            assert!(path.exists());
        }

        assert!(fs::symlink_metadata(&path).is_err());
    }

    #[test]
    fn test_error_path_removes_fifo() {
        fn failing_setup(path: &Path) -> Result<(), ChannelError> {
            let channel = CredentialChannel::acquire(path)?;
            Err(ChannelError::Write {
                path: channel.path().to_path_buf(),
                source: io::Error::other("dialer went away"),
            })
        }

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("chap-secrets");

        assert!(failing_setup(&path).is_err());
        assert!(fs::symlink_metadata(&path).is_err());
    }

    #[test]
    fn test_stale_file_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("chap-secrets");
        fs::write(&path, "\"old\" * \"leaked\"\n").unwrap();

        let channel = CredentialChannel::acquire(&path).unwrap();

        let meta = fs::symlink_metadata(channel.path()).unwrap();
        assert!(meta.file_type().is_fifo());
    }

    #[test]
    fn test_stale_fifo_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("chap-secrets");
        mkfifo(&path, Mode::S_IRWXU | Mode::S_IRWXG).unwrap();

        let channel = CredentialChannel::acquire(&path).unwrap();

        let meta = fs::symlink_metadata(channel.path()).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, CHANNEL_MODE);
    }

    #[test]
    fn test_acquire_fails_in_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("chap-secrets");

        let result = CredentialChannel::acquire(&path);

        assert!(matches!(result, Err(ChannelError::Create { .. })));
    }

    #[test]
    fn test_stale_directory_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("chap-secrets");
        fs::create_dir(&path).unwrap();

        let result = CredentialChannel::acquire(&path);

        assert!(matches!(result, Err(ChannelError::Stale { .. })));
        assert!(path.is_dir());
    }

    #[tokio::test]
    async fn test_deliver_serves_reader_that_opens_twice() {
        let temp_dir = TempDir::new().unwrap();
        let channel = CredentialChannel::acquire(temp_dir.path().join("chap-secrets")).unwrap();
        let record = "\"student\" * \"hunter2\"\n";

        let (closed_tx, closed_rx) = mpsc::channel();
        let reader_path = channel.path().to_path_buf();
        let reader = thread::spawn(move || {
            let mut reads = Vec::new();
            for _ in 0..2 {
                let mut file = File::open(&reader_path).unwrap();
                let mut content = String::new();
                file.read_to_string(&mut content).unwrap();
                drop(file);
                reads.push(content);
                closed_tx.send(()).unwrap();
            }
            reads
        });

        let calls = Arc::new(AtomicUsize::new(0));
        let gate = ReaderGate {
            closed: Mutex::new(closed_rx),
            calls: Arc::clone(&calls),
        };
        let writer = SecretWriter::with_check(2, Duration::from_millis(5), gate);

        writer.deliver(channel.path(), record).await.unwrap();

        let reads = reader.join().unwrap();
        assert_eq!(reads, vec![record.to_string(), record.to_string()]);
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_deliver_respects_attempt_count() {
        let temp_dir = TempDir::new().unwrap();
        let channel = CredentialChannel::acquire(temp_dir.path().join("chap-secrets")).unwrap();

        let (closed_tx, closed_rx) = mpsc::channel();
        let reader_path = channel.path().to_path_buf();
        let reader = thread::spawn(move || {
            for _ in 0..3 {
                let mut file = File::open(&reader_path).unwrap();
                let mut content = String::new();
                file.read_to_string(&mut content).unwrap();
                drop(file);
                closed_tx.send(()).unwrap();
            }
        });

        let calls = Arc::new(AtomicUsize::new(0));
        let gate = ReaderGate {
            closed: Mutex::new(closed_rx),
            calls: Arc::clone(&calls),
        };
        let writer = SecretWriter::with_check(3, Duration::from_millis(5), gate);

        writer.deliver(channel.path(), "x\n").await.unwrap();

        reader.join().unwrap();
        assert!(calls.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_lsof_sees_open_handle() {
        if std::process::Command::new("lsof").arg("-v").output().is_err() {
            eprintln!("lsof not installed, skipping");
            return;
        }
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("held");
        let file = fs::File::create(&path).unwrap();

        assert!(Lsof.is_held(&path).await.unwrap());

        drop(file);
        assert!(!Lsof.is_held(&path).await.unwrap());
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        let writer = SecretWriter::new(0, Duration::from_millis(5));
        assert_eq!(writer.attempts, 1);
    }
}
