//! Persists the DUID-LLT across restarts so the client identifier stays stable even
//! though it's timestamped at generation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use dhcp4c_proto::duid::Duid;

pub fn duid_path(config_dir: &Path, package: &str) -> PathBuf {
    config_dir.join(format!("{package}.duid"))
}

/// Loads the DUID from `path`, generating and persisting a fresh one if it doesn't
/// exist yet (mode 0644, never rotated afterwards).
pub fn load_or_generate(path: &Path, hwtype: u16, hwaddr: [u8; 6]) -> io::Result<Duid> {
    match fs::read_to_string(path) {
        Ok(hex) => parse_hex(hex.trim()).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "malformed DUID file")
        }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            let duid = Duid::generate(hwtype, hwaddr, now);
            persist(path, &duid)?;
            Ok(duid)
        }
        Err(err) => Err(err),
    }
}

fn persist(path: &Path, duid: &Duid) -> io::Result<()> {
    let mut encoded = [0u8; Duid::ENCODED_LEN];
    duid.encode(&mut encoded);

    let mut hex = String::with_capacity(encoded.len() * 2 + 1);
    for byte in encoded {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex.push('\n');

    fs::write(path, &hex)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o644))?;
    }

    Ok(())
}

fn parse_hex(hex: &str) -> Option<Duid> {
    if hex.len() != Duid::ENCODED_LEN * 2 {
        return None;
    }

    let mut bytes = [0u8; Duid::ENCODED_LEN];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }

    Duid::decode(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_then_reloads_the_same_duid() {
        let dir = std::env::temp_dir().join(format!("dhcp4c-duid-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = duid_path(&dir, "dhcp4c");
        fs::remove_file(&path).ok();

        let hwaddr = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];
        let first = load_or_generate(&path, 1, hwaddr).unwrap();
        let second = load_or_generate(&path, 1, hwaddr).unwrap();
        assert_eq!(first, second);

        fs::remove_dir_all(&dir).ok();
    }
}
