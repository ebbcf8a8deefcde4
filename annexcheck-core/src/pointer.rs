//! Annex pointer blob classification
//!
//! An annexed file is committed as a small blob (a symlink target or an
//! unlocked pointer file) whose text names the content key, e.g.
//! `../../.git/annex/objects/Xy/Zw/SHA256E-s10--abcdef/SHA256E-s10--abcdef`.
//!
//! Classification looks at a single read of at most [`MAX_POINTER_SIZE`]
//! bytes. A reader that hands back fewer bytes than requested is classified
//! on that prefix; there is no retry to fill the buffer.
//!
//! Keys are kept as raw bytes. git-annex hashes the exact bytes of a key, and
//! WORM keys embed file names that need not be valid UTF-8.

use std::fmt;
use std::io::{self, Read};

/// Blobs larger than this are never pointers.
pub const MAX_POINTER_SIZE: u64 = 1024;

const ANNEX_OBJECTS_MARKER: &str = "annex/objects";

/// Content key named by a pointer blob
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentKey(Vec<u8>);

impl ContentKey {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self(key.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Classify a blob of `size` bytes whose content is available from `reader`.
///
/// Returns `Ok(None)` for anything that is not a pointer. Read errors are
/// returned to the caller, which decides how to report them.
pub fn classify_blob(size: u64, reader: &mut dyn Read) -> io::Result<Option<ContentKey>> {
    if size == 0 || size > MAX_POINTER_SIZE {
        return Ok(None);
    }

    let mut buf = [0u8; MAX_POINTER_SIZE as usize];
    let n = reader.read(&mut buf)?;
    Ok(parse_pointer(&buf[..n]))
}

/// Extract the content key from pointer text, if it is one.
pub fn parse_pointer(content: &[u8]) -> Option<ContentKey> {
    let marker = ANNEX_OBJECTS_MARKER.as_bytes();
    if !content.windows(marker.len()).any(|w| w == marker) {
        return None;
    }

    let mut trimmed = content.trim_ascii();
    while let Some(rest) = trimmed.strip_suffix(b"/") {
        trimmed = rest;
    }
    let key = trimmed.rsplit(|b| *b == b'/').next().unwrap_or(trimmed);
    if key.is_empty() {
        return None;
    }
    Some(ContentKey::new(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader that never returns more than `chunk` bytes per call.
    struct Trickle<'a> {
        data: &'a [u8],
        chunk: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk on fire"))
        }
    }

    #[test]
    fn test_pointer_is_classified() {
        let content = b".git/annex/objects/3f/a1/SHA256E-s10--abcdef";
        let key = classify_blob(content.len() as u64, &mut Cursor::new(&content[..]))
            .unwrap()
            .unwrap();
        assert_eq!(key.as_bytes(), b"SHA256E-s10--abcdef");
    }

    #[test]
    fn test_symlink_target_with_trailing_newline() {
        let content = b"../../.git/annex/objects/21/K9/SHA256E-s10--abcdef/SHA256E-s10--abcdef\n";
        let key = parse_pointer(content).unwrap();
        assert_eq!(key, ContentKey::new("SHA256E-s10--abcdef"));
    }

    #[test]
    fn test_unlocked_pointer_file() {
        let key = parse_pointer(b"/annex/objects/WORM-s3-m1500000000--a.txt\n").unwrap();
        assert_eq!(key.to_string(), "WORM-s3-m1500000000--a.txt");
    }

    #[test]
    fn test_key_bytes_are_kept_verbatim() {
        let key = parse_pointer(b"/annex/objects/WORM-s3-m1500000000--caf\xe9.txt\n").unwrap();
        assert_eq!(key.as_bytes(), b"WORM-s3-m1500000000--caf\xe9.txt");
        assert_eq!(key.to_string(), "WORM-s3-m1500000000--caf\u{fffd}.txt");
    }

    #[test]
    fn test_empty_blob_is_not_a_pointer() {
        let mut reader = Cursor::new(b".git/annex/objects/a/b/KEY".to_vec());
        assert!(classify_blob(0, &mut reader).unwrap().is_none());
    }

    #[test]
    fn test_oversized_blob_is_not_a_pointer() {
        let mut content = b".git/annex/objects/a/b/KEY".to_vec();
        content.resize(1025, b' ');
        let mut reader = Cursor::new(content);
        assert!(classify_blob(1025, &mut reader).unwrap().is_none());
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let mut content = b"annex/objects/KEY".to_vec();
        content.resize(1024, b'\n');
        let key = classify_blob(1024, &mut Cursor::new(content)).unwrap();
        assert_eq!(key, Some(ContentKey::new("KEY")));
    }

    #[test]
    fn test_ordinary_text_is_not_a_pointer() {
        let content = b"just a readme\n";
        let result = classify_blob(content.len() as u64, &mut Cursor::new(&content[..])).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_classifies_on_first_read_only() {
        let content = b".git/annex/objects/3f/a1/SHA256E-s10--abcdef";
        let mut reader = Trickle {
            data: content,
            chunk: 8,
        };
        // Only ".git/ann" is seen, which is not a pointer.
        let result = classify_blob(content.len() as u64, &mut reader).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_read_failure_is_reported() {
        assert!(classify_blob(10, &mut Broken).is_err());
    }
}
