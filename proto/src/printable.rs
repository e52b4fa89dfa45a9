//! Shell-safe rendering of option values for hook-script environment variables: printable
//! bytes pass through inside double quotes, everything else becomes a `\ooo` octal escape.

use core::fmt::Write;

/// Writes `data` into `out` as a double-quoted, shell-safe string (including the quotes).
/// `"`, `'`, `\` and the other shell metacharacters get backslash-escaped; non-printable-ASCII
/// bytes become `\ooo` octal escapes, matching what a POSIX shell accepts inside double
/// quotes once the backslash sequences are unescaped.
pub fn write_quoted(out: &mut impl Write, data: &[u8]) -> core::fmt::Result {
    out.write_char('"')?;

    for &b in data {
        match b {
            b'"' | b'\'' | b'\\' | b'$' | b'`' | b'|' | b'&' => {
                out.write_char('\\')?;
                out.write_char(b as char)?;
            }
            0x20..=0x7e => out.write_char(b as char)?,
            _ => write!(out, "\\{:03o}", b)?,
        }
    }

    out.write_char('"')
}

/// Like [`write_quoted`] but into a fixed-capacity buffer, for callers without an allocator.
/// Returns `None` if `data` can't fit (worst case 5 output bytes per input byte plus quotes).
pub fn quoted_into<'o>(buf: &'o mut [u8], data: &[u8]) -> Option<&'o str> {
    struct Cursor<'a> {
        buf: &'a mut [u8],
        len: usize,
    }

    impl Write for Cursor<'_> {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            let bytes = s.as_bytes();
            if self.len + bytes.len() > self.buf.len() {
                return Err(core::fmt::Error);
            }
            self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
            self.len += bytes.len();
            Ok(())
        }
    }

    let mut cursor = Cursor { buf, len: 0 };
    write_quoted(&mut cursor, data).ok()?;
    let len = cursor.len;

    core::str::from_utf8(&buf[..len]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_shell_metacharacters() {
        let mut buf = [0u8; 64];
        let rendered = quoted_into(&mut buf, b"say \"hi\" $HOME").unwrap();
        assert_eq!(rendered, r#""say \"hi\" \$HOME""#);
    }

    #[test]
    fn octal_escapes_non_printable() {
        let mut buf = [0u8; 64];
        let rendered = quoted_into(&mut buf, &[0x01, b'x']).unwrap();
        assert_eq!(rendered, "\"\\001x\"");
    }

    #[test]
    fn plain_ascii_is_untouched() {
        let mut buf = [0u8; 64];
        let rendered = quoted_into(&mut buf, b"example.com").unwrap();
        assert_eq!(rendered, "\"example.com\"");
    }

    #[test]
    fn reports_overflow() {
        let mut buf = [0u8; 2];
        assert!(quoted_into(&mut buf, b"too long").is_none());
    }
}
