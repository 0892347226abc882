/*
 * nip44.rs
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

//! NIP-44 v2: ECDH(secp256k1) → HKDF-SHA256 → ChaCha20 + HMAC-SHA256
//! with length-prefixed padding. Payload is
//! `base64(0x02 ‖ nonce32 ‖ ciphertext ‖ mac32)`.
//!
//! The conversation key is the HKDF-Extract PRK with salt `"nip44-v2"`
//! over the shared x-coordinate; per-message keys expand from that PRK
//! with the 32-byte nonce as info. Symmetric in both directions:
//! `conversation_key(a, B) == conversation_key(b, A)`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::ChaCha20;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use secp256k1::ecdh::shared_secret_point;
use secp256k1::{PublicKey, SecretKey};
use sha2::Sha256;

use crate::error::{Error, Nip44Error};
use crate::hex;
use crate::keys::KeyPair;

type HmacSha256 = Hmac<Sha256>;

const VERSION: u8 = 0x02;
/// Floor for the decoded payload:
/// 1 (version) + 32 (nonce) + ciphertext + 32 (mac).
const MIN_DECODED_LEN: usize = 82;

/// Lift an x-only public key to a full point: try even-y first, fall
/// back to odd-y. Nostr keys carry no parity bit.
fn full_public_key(public_hex: &str) -> Result<PublicKey, Error> {
    let x = hex::decode32(public_hex)?;
    let mut compressed = [0u8; 33];
    compressed[0] = 0x02;
    compressed[1..].copy_from_slice(&x);
    match PublicKey::from_slice(&compressed) {
        Ok(pk) => Ok(pk),
        Err(_) => {
            compressed[0] = 0x03;
            PublicKey::from_slice(&compressed)
                .map_err(|e| Error::Crypto(format!("invalid public key: {}", e)))
        }
    }
}

/// Derive the shared conversation key from our secret and the peer's
/// x-only public key.
pub fn conversation_key(keys: &KeyPair, peer_public_hex: &str) -> Result<[u8; 32], Error> {
    conversation_key_from_parts(keys.secret_key(), peer_public_hex)
}

pub(crate) fn conversation_key_from_parts(
    secret_key: &SecretKey,
    peer_public_hex: &str,
) -> Result<[u8; 32], Error> {
    let peer = full_public_key(peer_public_hex)?;
    let point = shared_secret_point(&peer, secret_key);
    let shared_x = &point[0..32];
    let (prk, _) = Hkdf::<Sha256>::extract(Some(b"nip44-v2"), shared_x);
    Ok(prk.into())
}

fn message_keys(
    conversation_key: &[u8; 32],
    nonce: &[u8; 32],
) -> Result<([u8; 32], [u8; 12], [u8; 32]), Error> {
    let hk = Hkdf::<Sha256>::from_prk(conversation_key)
        .map_err(|_| Error::Crypto(String::from("invalid conversation key")))?;
    let mut okm = [0u8; 76];
    hk.expand(nonce, &mut okm)
        .map_err(|_| Error::Crypto(String::from("HKDF expand failed for message keys")))?;
    let mut chacha_key = [0u8; 32];
    chacha_key.copy_from_slice(&okm[0..32]);
    let mut chacha_nonce = [0u8; 12];
    chacha_nonce.copy_from_slice(&okm[32..44]);
    let mut hmac_key = [0u8; 32];
    hmac_key.copy_from_slice(&okm[44..76]);
    Ok((chacha_key, chacha_nonce, hmac_key))
}

/// Padded length for a plaintext of `unpadded_len` bytes: 32 up to 32,
/// then the next bucket (32 below 256, `2^k / 8` above).
pub fn calc_padded_len(unpadded_len: usize) -> Result<usize, Error> {
    if unpadded_len < 1 || unpadded_len > 65535 {
        return Err(Error::Nip44(Nip44Error::InvalidPadding));
    }
    if unpadded_len <= 32 {
        return Ok(32);
    }
    let next_power = 1usize << (usize::BITS - (unpadded_len - 1).leading_zeros());
    let chunk = if next_power <= 256 { 32 } else { next_power / 8 };
    Ok(chunk * (((unpadded_len - 1) / chunk) + 1))
}

/// 2-byte big-endian length prefix, zero-padded to the bucket size.
fn pad(plaintext: &[u8]) -> Result<Vec<u8>, Error> {
    let padded_len = calc_padded_len(plaintext.len())?;
    let mut padded = Vec::with_capacity(2 + padded_len);
    padded.push((plaintext.len() >> 8) as u8);
    padded.push((plaintext.len() & 0xff) as u8);
    padded.extend_from_slice(plaintext);
    padded.resize(2 + padded_len, 0);
    Ok(padded)
}

fn unpad(padded: &[u8]) -> Result<Vec<u8>, Error> {
    if padded.len() < 2 {
        return Err(Error::Nip44(Nip44Error::InvalidPadding));
    }
    let unpadded_len = ((padded[0] as usize) << 8) | padded[1] as usize;
    if unpadded_len == 0 {
        return Err(Error::Nip44(Nip44Error::InvalidPadding));
    }
    let expected = calc_padded_len(unpadded_len)?;
    if padded.len() != 2 + expected {
        return Err(Error::Nip44(Nip44Error::InvalidPadding));
    }
    if padded[2 + unpadded_len..].iter().any(|&b| b != 0) {
        return Err(Error::Nip44(Nip44Error::InvalidPadding));
    }
    Ok(padded[2..2 + unpadded_len].to_vec())
}

fn hmac_with_aad(hmac_key: &[u8; 32], nonce: &[u8; 32], ciphertext: &[u8]) -> Result<[u8; 32], Error> {
    let mut mac = HmacSha256::new_from_slice(hmac_key)
        .map_err(|_| Error::Crypto(String::from("HMAC key error")))?;
    mac.update(&[VERSION]);
    mac.update(nonce);
    mac.update(ciphertext);
    let digest = mac.finalize().into_bytes();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Ok(out)
}

/// Encrypt with a fresh CSPRNG nonce. A CSPRNG failure propagates; it
/// is never replaced by zeroes.
pub fn encrypt(plaintext: &str, conversation_key: &[u8; 32]) -> Result<String, Error> {
    let mut nonce = [0u8; 32];
    getrandom::getrandom(&mut nonce).map_err(|e| Error::Crypto(format!("RNG error: {}", e)))?;
    encrypt_with_nonce(plaintext, conversation_key, &nonce)
}

/// Deterministic variant for tests and protocol vectors.
pub fn encrypt_with_nonce(
    plaintext: &str,
    conversation_key: &[u8; 32],
    nonce: &[u8; 32],
) -> Result<String, Error> {
    let bytes = plaintext.as_bytes();
    if bytes.is_empty() || bytes.len() > 65535 {
        return Err(Error::Nip44(Nip44Error::Encrypt(format!(
            "plaintext length {} out of range 1..65535",
            bytes.len()
        ))));
    }
    let (chacha_key, chacha_nonce, hmac_key) = message_keys(conversation_key, nonce)?;
    let mut ciphertext = pad(bytes)?;
    let mut cipher = ChaCha20::new((&chacha_key).into(), (&chacha_nonce).into());
    cipher.apply_keystream(&mut ciphertext);
    let mac = hmac_with_aad(&hmac_key, nonce, &ciphertext)?;

    let mut payload = Vec::with_capacity(1 + 32 + ciphertext.len() + 32);
    payload.push(VERSION);
    payload.extend_from_slice(nonce);
    payload.extend_from_slice(&ciphertext);
    payload.extend_from_slice(&mac);
    Ok(BASE64.encode(&payload))
}

/// Decrypt a `base64(0x02 ‖ nonce ‖ ciphertext ‖ mac)` payload. MAC is
/// checked in constant time before any decryption happens.
pub fn decrypt(payload: &str, conversation_key: &[u8; 32]) -> Result<String, Error> {
    if payload.is_empty() {
        return Err(Error::Nip44(Nip44Error::InvalidPayload(String::from("empty"))));
    }
    // '#' marks a future non-base64 versioned format
    if payload.starts_with('#') {
        return Err(Error::Nip44(Nip44Error::UnsupportedVersion(0)));
    }
    let data = BASE64
        .decode(payload)
        .map_err(|e| Error::Nip44(Nip44Error::InvalidPayload(format!("base64: {}", e))))?;
    if data.len() < MIN_DECODED_LEN {
        return Err(Error::Nip44(Nip44Error::InvalidPayload(format!(
            "decoded length {} below minimum {}",
            data.len(),
            MIN_DECODED_LEN
        ))));
    }
    if data[0] != VERSION {
        return Err(Error::Nip44(Nip44Error::UnsupportedVersion(data[0])));
    }
    let mut nonce = [0u8; 32];
    nonce.copy_from_slice(&data[1..33]);
    let ciphertext = &data[33..data.len() - 32];
    let mac = &data[data.len() - 32..];

    let (chacha_key, chacha_nonce, hmac_key) = message_keys(conversation_key, &nonce)?;
    let expected = hmac_with_aad(&hmac_key, &nonce, ciphertext)?;
    if !hex::constant_time_eq(mac, &expected) {
        return Err(Error::Nip44(Nip44Error::MacMismatch));
    }

    let mut padded = ciphertext.to_vec();
    let mut cipher = ChaCha20::new((&chacha_key).into(), (&chacha_nonce).into());
    cipher.apply_keystream(&mut padded);
    let plaintext = unpad(&padded)?;
    String::from_utf8(plaintext)
        .map_err(|e| Error::Nip44(Nip44Error::Decrypt(format!("invalid UTF-8: {}", e))))
}
