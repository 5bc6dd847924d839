//! Per-project advisory lock.
//!
//! `flock(2)` on `<name>.lock` beside the record. The kernel drops the lock
//! when the holding process exits, so a crashed command never leaves a
//! project wedged. The lock file itself is left in place; removing it would
//! let a waiter and a newcomer lock two different inodes.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{CoordError, CoordResult};

/// Exclusive lock guard; released on drop.
#[derive(Debug)]
pub struct ProjectLock {
    file: File,
    path: PathBuf,
}

impl ProjectLock {
    /// Poll for the lock until `timeout` elapses.
    ///
    /// Fails with a retryable `Contention` error naming the holder pid when
    /// the file records one.
    pub fn acquire(
        project: &str,
        path: &Path,
        timeout: Duration,
        poll_interval: Duration,
    ) -> CoordResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        let fd = file.as_raw_fd();
        let started = Instant::now();
        let deadline = started + timeout;

        loop {
            // SAFETY: fd belongs to `file`, which outlives this call.
            let ret = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
            if ret == 0 {
                write_pid(&mut file)?;
                debug!(
                    project,
                    lock = %path.display(),
                    waited_ms = started.elapsed().as_millis() as u64,
                    "acquired project lock"
                );
                return Ok(Self {
                    file,
                    path: path.to_path_buf(),
                });
            }

            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::EWOULDBLOCK) {
                return Err(err.into());
            }

            if Instant::now() >= deadline {
                let holder = read_pid(&mut file);
                debug!(project, ?holder, "timed out waiting for project lock");
                return Err(CoordError::Contention {
                    project: project.to_string(),
                    waited_ms: started.elapsed().as_millis() as u64,
                    holder,
                });
            }

            std::thread::sleep(poll_interval);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        // SAFETY: fd is still owned by self.file.
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
        debug!(lock = %self.path.display(), "released project lock");
    }
}

fn write_pid(file: &mut File) -> std::io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(file, "{}", std::process::id())?;
    file.flush()
}

fn read_pid(file: &mut File) -> Option<u32> {
    let mut contents = String::new();
    file.seek(SeekFrom::Start(0)).ok()?;
    file.read_to_string(&mut contents).ok()?;
    contents.trim().parse().ok()
}
