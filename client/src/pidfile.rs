//! PID file with an advisory exclusive lock: the lock, not the file's mere existence, is
//! what guarantees one running instance per interface.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

pub fn pid_path(run_dir: &Path, package: &str, ifname: &str) -> PathBuf {
    run_dir.join(format!("{package}-{ifname}.pid"))
}

/// A held PID file; the lock is released (and, per `unix`, the advisory lock with it)
/// when this is dropped.
pub struct PidFile {
    file: File,
    path: PathBuf,
}

impl PidFile {
    /// Opens (creating if needed) and locks `path`, writing the current PID into it. If
    /// another process already holds the lock this returns `WouldBlock`; if the file
    /// exists but is unlocked (a stale file from a crashed process) it's truncated and
    /// reused rather than treated as a conflict.
    pub fn acquire(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;

        flock_exclusive_nonblocking(&file)?;

        file.set_len(0)?;
        let mut file = file;
        writeln!(file, "{}", std::process::id())?;
        file.flush()?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(unix)]
fn flock_exclusive_nonblocking(file: &File) -> io::Result<()> {
    let ret = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if ret == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn flock_exclusive_nonblocking(_file: &File) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquires_and_releases() {
        let dir = std::env::temp_dir().join(format!("dhcp4c-pid-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = pid_path(&dir, "dhcp4c", "eth0");

        {
            let _pid = PidFile::acquire(&path).unwrap();
            assert!(path.exists());
        }

        assert!(!path.exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn second_acquire_fails_while_first_is_held() {
        let dir = std::env::temp_dir().join(format!("dhcp4c-pid-test2-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = pid_path(&dir, "dhcp4c", "eth0");

        let _first = PidFile::acquire(&path).unwrap();
        assert!(PidFile::acquire(&path).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
