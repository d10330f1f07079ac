// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Shared-memory object naming.
//
// One region fans out into several named objects (the window itself, its
// gate, per-core doorbells and wake events), all derived by suffixing the
// caller's base name. Every derived name is normalized here so that each
// participant resolves the same OS-level object.

/// FNV-1a, 64-bit.
pub fn fnv1a_64(data: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in data {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// 64-bit value as fixed-width lowercase hex.
fn to_hex(val: u64) -> [u8; 16] {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut buf = [0u8; 16];
    let mut v = val;
    for i in (0..16).rev() {
        buf[i] = DIGITS[(v & 0xf) as usize];
        v >>= 4;
    }
    buf
}

/// Maximum length of a POSIX shm name, 0 meaning no limit.
///
/// macOS caps names at `PSHMNAMLEN` (31); Linux allows up to `NAME_MAX`.
#[cfg(target_os = "macos")]
pub const SHM_NAME_MAX: usize = 31;

#[cfg(not(target_os = "macos"))]
pub const SHM_NAME_MAX: usize = 0;

/// Normalize `name` into a POSIX shm-safe form with a leading '/'.
///
/// Names that would exceed [`SHM_NAME_MAX`] collapse to
/// `/<prefix>_<16-hex-fnv1a>`: the prefix keeps the name recognizable in
/// `/dev/shm` listings, the hash keeps distinct long names distinct. Two
/// processes passing the same base name always resolve the same object.
pub fn make_shm_name(name: &str) -> String {
    let result = if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{name}")
    };

    if SHM_NAME_MAX == 0 || result.len() <= SHM_NAME_MAX {
        return result;
    }

    // 1 (underscore) + 16 (hex hash)
    const HASH_SUFFIX_LEN: usize = 1 + 16;
    let prefix_len = if SHM_NAME_MAX > HASH_SUFFIX_LEN + 1 {
        SHM_NAME_MAX - HASH_SUFFIX_LEN - 1 // -1 for leading '/'
    } else {
        0
    };

    let hash = fnv1a_64(result.as_bytes());
    let hex = to_hex(hash);
    let hex_str = std::str::from_utf8(&hex).unwrap();

    let mut shortened = String::with_capacity(SHM_NAME_MAX);
    shortened.push('/');
    if prefix_len > 0 {
        let original_body = &result[1..];
        let take = prefix_len.min(original_body.len());
        shortened.push_str(&original_body[..take]);
    }
    shortened.push('_');
    shortened.push_str(hex_str);
    shortened
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_known_value() {
        // offset basis: hash of the empty string
        assert_eq!(fnv1a_64(b""), 0xcbf29ce484222325);
    }

    #[test]
    fn prepends_slash() {
        let name = make_shm_name("region");
        assert!(name.starts_with('/'));
        assert!(name.contains("region"));
    }

    #[test]
    fn keeps_existing_slash() {
        assert_eq!(&make_shm_name("/region")[..7], "/region");
    }

    #[test]
    fn derived_suffixes_stay_distinct() {
        let a = make_shm_name("region_db0");
        let b = make_shm_name("region_db1");
        assert_ne!(a, b);
    }

    #[test]
    fn to_hex_is_fixed_width() {
        assert_eq!(&to_hex(0x0123456789abcdef), b"0123456789abcdef");
        assert_eq!(&to_hex(0), b"0000000000000000");
    }
}
