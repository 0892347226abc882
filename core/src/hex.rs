/*
 * hex.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Rondine, a cross-platform Nostr client library.
 *
 * Rondine is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Rondine is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Rondine.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Hex codec and validation predicates. All protocol identifiers travel
//! as lower-case hex: keys and event ids 64 chars, signatures 128.
//! Parsers here run before any cryptographic operation.

use subtle::ConstantTimeEq;

use crate::error::Error;

/// 32-byte key or event id.
pub const HEX_KEY_LEN: usize = 64;
/// 64-byte Schnorr signature.
pub const HEX_SIG_LEN: usize = 128;

/// True when `s` is exactly 64 hex characters (key or event id).
pub fn is_valid_hex_key(s: &str) -> bool {
    s.len() == HEX_KEY_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// True when `s` is exactly 128 hex characters (signature).
pub fn is_valid_hex_sig(s: &str) -> bool {
    s.len() == HEX_SIG_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Decode hex of any even length. Case-insensitive.
pub fn decode(hex: &str) -> Result<Vec<u8>, Error> {
    if hex.len() % 2 != 0 {
        return Err(Error::Validation(String::from("hex string must have even length")));
    }
    let bytes = hex.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() / 2);
    let mut i = 0;
    while i < bytes.len() {
        let high = hex_val(bytes[i])
            .ok_or_else(|| Error::Validation(format!("invalid hex char: {}", bytes[i] as char)))?;
        let low = hex_val(bytes[i + 1])
            .ok_or_else(|| Error::Validation(format!("invalid hex char: {}", bytes[i + 1] as char)))?;
        out.push((high << 4) | low);
        i += 2;
    }
    Ok(out)
}

/// Decode a 64-hex key/id into 32 bytes, rejecting wrong lengths up front.
pub fn decode32(hex: &str) -> Result<[u8; 32], Error> {
    if !is_valid_hex_key(hex) {
        return Err(Error::Validation(format!(
            "expected 64 hex characters, got {} characters",
            hex.len()
        )));
    }
    let bytes = decode(hex)?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Decode a 128-hex signature into 64 bytes.
pub fn decode64(hex: &str) -> Result<[u8; 64], Error> {
    if !is_valid_hex_sig(hex) {
        return Err(Error::Validation(format!(
            "expected 128 hex characters, got {} characters",
            hex.len()
        )));
    }
    let bytes = decode(hex)?;
    let mut out = [0u8; 64];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Encode bytes as lower-case hex.
pub fn encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut s = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        s.push(HEX[(b >> 4) as usize] as char);
        s.push(HEX[(b & 0x0f) as usize] as char);
    }
    s
}

/// Constant-time byte comparison. Use for MACs and anything derived
/// from secret material.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Constant-time comparison of two hex strings after normalizing case.
/// Length mismatch short-circuits; contents never do.
pub fn constant_time_eq_hex(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    constant_time_eq(a.as_bytes(), b.as_bytes())
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let hex = "deadbeef01234567890abcdef0123456789abcdef0123456789abcdef01234ab";
        let bytes = decode(hex).unwrap();
        assert_eq!(encode(&bytes), hex);
    }

    #[test]
    fn upper_case_accepted_lower_emitted() {
        let bytes = decode("DEADBEEF").unwrap();
        assert_eq!(encode(&bytes), "deadbeef");
    }

    #[test]
    fn rejects_odd_length_and_bad_chars() {
        assert!(decode("abc").is_err());
        assert!(decode("zz").is_err());
        assert!(decode("0g").is_err());
    }

    #[test]
    fn key_predicates() {
        let key = "3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d";
        assert!(is_valid_hex_key(key));
        assert!(!is_valid_hex_key(&key[..63]));
        assert!(!is_valid_hex_key(&format!("{}0", key)));
        assert!(is_valid_hex_sig(&"a".repeat(128)));
        assert!(!is_valid_hex_sig(&"a".repeat(127)));
    }

    #[test]
    fn decode32_enforces_length() {
        assert!(decode32("abcd").is_err());
        let key = "3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d";
        assert_eq!(encode(&decode32(key).unwrap()), key);
    }

    #[test]
    fn constant_time_compare() {
        assert!(constant_time_eq(b"abcd", b"abcd"));
        assert!(!constant_time_eq(b"abcd", b"abce"));
        assert!(!constant_time_eq(b"abcd", b"abc"));
        assert!(constant_time_eq_hex("DEADBEEF", "deadbeef"));
    }
}
