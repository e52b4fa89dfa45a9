//! Persists the raw bytes of the last accepted DHCP message so a restart can attempt
//! INIT-REBOOT instead of a cold DISCOVER.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use dhcp4c_proto::Packet;

/// Path of the lease file for a given state directory, package name and interface.
pub fn lease_path(state_dir: &Path, package: &str, ifname: &str) -> PathBuf {
    state_dir.join(format!("{package}-{ifname}.lease"))
}

/// A lease re-read from disk, with the message bytes still owned so the caller can
/// re-decode the `Packet` from them, plus how long ago the file was last written.
pub struct PersistedLease {
    pub bytes: Vec<u8>,
    pub elapsed_since_bound: std::time::Duration,
}

/// Writes `message` verbatim (236-byte header plus options, exactly as received) to
/// `path`, via write-to-temp-then-rename so a crash mid-write never corrupts the file a
/// concurrent reader might observe.
pub fn write_lease(path: &Path, message: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("lease.tmp");
    fs::write(&tmp, message)?;
    fs::rename(&tmp, path)
}

/// Reads the lease file back, if present. Returns `Ok(None)` when there is no lease on
/// disk (not an error: this is the common case on first start).
pub fn read_lease(path: &Path) -> io::Result<Option<PersistedLease>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };

    let metadata = fs::metadata(path)?;
    let modified = metadata.modified()?;
    let elapsed_since_bound = SystemTime::now()
        .duration_since(modified)
        .unwrap_or_default();

    Ok(Some(PersistedLease {
        bytes,
        elapsed_since_bound,
    }))
}

/// Re-parses a persisted lease's bytes as a `Packet`, the same codec used for messages
/// received off the wire.
pub fn decode(lease: &PersistedLease) -> Result<Packet<'_>, dhcp4c_proto::Error> {
    Packet::decode(&lease.bytes)
}

/// Deletes the lease file; used on RELEASE or user stop unless persistent mode is set.
/// Deleting a file that's already gone is not an error.
pub fn delete_lease(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_a_temp_dir() {
        let dir = std::env::temp_dir().join(format!("dhcp4c-lease-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = lease_path(&dir, "dhcp4c", "eth0");

        let mut message = vec![0u8; 236];
        message[0] = 2; // BOOTREPLY
        message.extend_from_slice(&[0x63, 0x82, 0x53, 0x63]);
        message.push(255); // END

        write_lease(&path, &message).unwrap();
        let persisted = read_lease(&path).unwrap().unwrap();
        assert_eq!(persisted.bytes, message);

        delete_lease(&path).unwrap();
        assert!(read_lease(&path).unwrap().is_none());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let path = PathBuf::from("/nonexistent/dhcp4c-test.lease");
        assert!(read_lease(&path).unwrap().is_none());
    }
}
