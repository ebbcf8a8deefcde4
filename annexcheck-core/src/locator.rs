//! Annex object locations
//!
//! git-annex has stored object content under two hash directory layouts over
//! its lifetime. Both derive a two-level directory from the MD5 digest of the
//! key, and both must match the on-disk layout bit for bit:
//!
//! - **lower**: `abc/def/KEY` from the first six hex digits of the digest
//! - **mixed**: `Xy/Zw/KEY` from the first 32-bit word of the digest, encoded
//!   with a 32-letter alphabet
//!
//! See <https://git-annex.branchable.com/internals/hashing/>.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::PathBuf;

/// Alphabet for the mixed-case layout, indexed by a 5-bit value.
const MIXED_LETTERS: &[u8; 32] = b"0123456789zqjxkmvwgpfZQJXKMVWGPF";

/// Relative location of `key` under the lower-case hash layout.
pub fn hash_dir_lower(key: impl AsRef<[u8]>) -> PathBuf {
    let key = key.as_ref();
    let digest = md5::compute(key);
    let hex = hex::encode(digest.0);

    let mut path = PathBuf::from(&hex[..3]);
    path.push(&hex[3..6]);
    path.push(key_component(key));
    path
}

/// Relative location of `key` under the older mixed-case hash layout.
pub fn hash_dir_mixed(key: impl AsRef<[u8]>) -> PathBuf {
    let key = key.as_ref();
    let digest = md5::compute(key);
    // first word of the digest, byte-reversed
    let mut word = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]);

    let mut letters = [0u8; 4];
    for letter in letters.iter_mut() {
        *letter = MIXED_LETTERS[(word & 31) as usize];
        word >>= 6;
    }

    let first = format!("{}{}", letters[1] as char, letters[0] as char);
    let second = format!("{}{}", letters[3] as char, letters[2] as char);
    let mut path = PathBuf::from(first);
    path.push(second);
    path.push(key_component(key));
    path
}

#[cfg(unix)]
fn key_component(key: &[u8]) -> Cow<'_, OsStr> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(OsStr::from_bytes(key))
}

// Non-UTF-8 keys cannot be spelled exactly here.
#[cfg(not(unix))]
fn key_component(key: &[u8]) -> Cow<'_, OsStr> {
    match String::from_utf8_lossy(key) {
        Cow::Borrowed(s) => Cow::Borrowed(OsStr::new(s)),
        Cow::Owned(s) => Cow::Owned(s.into()),
    }
}
