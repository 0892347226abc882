/*
 * keys.rs
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

//! BIP-340 Schnorr keypair on secp256k1. Secret material is held in a
//! zeroizing container and wiped on drop; Debug output never shows it.

use std::fmt;

use secp256k1::{Keypair, Secp256k1, SecretKey, XOnlyPublicKey};
use zeroize::{Zeroize, Zeroizing};

use crate::error::Error;
use crate::event::Event;
use crate::hex;
use crate::nip19;

/// Schnorr keypair. The x-only public key is kept as lower-case hex,
/// the canonical transport form.
pub struct KeyPair {
    secret_key: SecretKey,
    secret_hex: Zeroizing<String>,
    public_hex: String,
}

impl KeyPair {
    /// Generate a keypair from the system CSPRNG. The scalar is
    /// rejection-sampled until it falls in `[1, n-1]`.
    pub fn generate() -> Result<Self, Error> {
        let mut seed = [0u8; 32];
        loop {
            getrandom::getrandom(&mut seed)
                .map_err(|e| Error::Crypto(format!("RNG error: {}", e)))?;
            if let Ok(secret_key) = SecretKey::from_slice(&seed) {
                let pair = Self::from_parts(secret_key);
                seed.zeroize();
                return Ok(pair);
            }
        }
    }

    /// Build from a 64-hex secret key. Case-insensitive.
    pub fn from_secret_hex(secret_hex: &str) -> Result<Self, Error> {
        if !hex::is_valid_hex_key(secret_hex) {
            return Err(Error::Validation(String::from(
                "secret key must be 64 hex characters",
            )));
        }
        let bytes = hex::decode32(secret_hex)?;
        let secret_key = SecretKey::from_slice(&bytes)
            .map_err(|e| Error::Crypto(format!("invalid secret key: {}", e)))?;
        Ok(Self::from_parts(secret_key))
    }

    /// Build from either `nsec1…` or 64-hex input, auto-detected.
    pub fn from_secret_key(input: &str) -> Result<Self, Error> {
        let trimmed = input.trim();
        if trimmed.starts_with("nsec1") {
            let secret_hex = nip19::nsec_to_hex(trimmed)?;
            Self::from_secret_hex(&secret_hex)
        } else {
            Self::from_secret_hex(trimmed)
        }
    }

    fn from_parts(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let keypair = Keypair::from_secret_key(&secp, &secret_key);
        let (xonly, _) = XOnlyPublicKey::from_keypair(&keypair);
        let secret_hex = Zeroizing::new(hex::encode(&secret_key.secret_bytes()));
        let public_hex = hex::encode(&xonly.serialize());
        Self {
            secret_key,
            secret_hex,
            public_hex,
        }
    }

    /// X-only public key, lower-case hex.
    pub fn public_key_hex(&self) -> &str {
        &self.public_hex
    }

    /// Secret key as lower-case hex. Handle with care; the returned
    /// reference borrows the zeroizing container.
    pub fn secret_key_hex(&self) -> &str {
        &self.secret_hex
    }

    pub(crate) fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    /// Sign an unsigned event: fill `pubkey` if empty, recompute `id`,
    /// and produce a BIP-340 signature over the 32-byte id digest
    /// (the digest is the message; it is not hashed again).
    pub fn sign_event(&self, event: &mut Event) -> Result<(), Error> {
        if event.pubkey.is_empty() {
            event.pubkey = self.public_hex.clone();
        } else if !event.pubkey.eq_ignore_ascii_case(&self.public_hex) {
            return Err(Error::Validation(String::from(
                "event pubkey does not match signing key",
            )));
        }
        event.validate()?;
        let id = event.compute_id();
        event.sig = self.sign_digest_hex(&id)?;
        event.id = id;
        Ok(())
    }

    /// Schnorr-sign a 32-byte digest given as 64-hex. Returns the
    /// 128-hex signature.
    pub fn sign_digest_hex(&self, digest_hex: &str) -> Result<String, Error> {
        let digest = hex::decode32(digest_hex)?;
        let message = secp256k1::Message::from_digest_slice(&digest)
            .map_err(|e| Error::Crypto(format!("message error: {}", e)))?;
        let secp = Secp256k1::new();
        let keypair = Keypair::from_secret_key(&secp, &self.secret_key);
        let signature = secp.sign_schnorr_no_aux_rand(&message, &keypair);
        Ok(hex::encode(signature.as_ref()))
    }

    /// Bech32 form of the public key.
    pub fn npub(&self) -> Result<String, Error> {
        nip19::encode_npub(&self.public_hex)
    }

    /// Bech32 form of the secret key. Handle with care.
    pub fn nsec(&self) -> Result<String, Error> {
        nip19::encode_nsec(&self.secret_hex)
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        self.secret_key.non_secure_erase();
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_hex", &self.public_hex)
            .field("secret_hex", &"<redacted>")
            .finish()
    }
}

/// Normalize a public key given as `npub1…` or 64-hex to lower-case hex.
pub fn public_key_to_hex(input: &str) -> Result<String, Error> {
    let trimmed = input.trim();
    if trimmed.starts_with("npub1") {
        nip19::npub_to_hex(trimmed)
    } else if hex::is_valid_hex_key(trimmed) {
        Ok(trimmed.to_lowercase())
    } else {
        Err(Error::Validation(String::from(
            "public key must be npub1... or 64 hex characters",
        )))
    }
}

/// Normalize a secret key given as `nsec1…` or 64-hex to lower-case hex.
pub fn secret_key_to_hex(input: &str) -> Result<String, Error> {
    let trimmed = input.trim();
    if trimmed.starts_with("nsec1") {
        nip19::nsec_to_hex(trimmed)
    } else if hex::is_valid_hex_key(trimmed) {
        Ok(trimmed.to_lowercase())
    } else {
        Err(Error::Validation(String::from(
            "secret key must be nsec1... or 64 hex characters",
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::KIND_TEXT_NOTE;

    #[test]
    fn generate_produces_valid_hex() {
        let keys = KeyPair::generate().unwrap();
        assert!(hex::is_valid_hex_key(keys.public_key_hex()));
        assert!(hex::is_valid_hex_key(keys.secret_key_hex()));
    }

    #[test]
    fn derivation_is_deterministic() {
        let keys = KeyPair::generate().unwrap();
        let again = KeyPair::from_secret_hex(keys.secret_key_hex()).unwrap();
        assert_eq!(keys.public_key_hex(), again.public_key_hex());
    }

    #[test]
    fn sign_and_verify() {
        let keys = KeyPair::generate().unwrap();
        let mut event = Event {
            id: String::new(),
            pubkey: String::new(),
            created_at: 1_700_000_000,
            kind: KIND_TEXT_NOTE,
            tags: Vec::new(),
            content: String::from("Hello"),
            sig: String::new(),
        };
        keys.sign_event(&mut event).unwrap();
        assert_eq!(event.pubkey, keys.public_key_hex());
        assert_eq!(event.id, event.compute_id());
        event.verify().unwrap();
    }

    #[test]
    fn sign_rejects_foreign_pubkey() {
        let keys = KeyPair::generate().unwrap();
        let other = KeyPair::generate().unwrap();
        let mut event = Event {
            id: String::new(),
            pubkey: other.public_key_hex().to_string(),
            created_at: 0,
            kind: KIND_TEXT_NOTE,
            tags: Vec::new(),
            content: String::new(),
            sig: String::new(),
        };
        assert!(keys.sign_event(&mut event).is_err());
    }

    #[test]
    fn nsec_auto_detect() {
        let keys = KeyPair::generate().unwrap();
        let nsec = keys.nsec().unwrap();
        let again = KeyPair::from_secret_key(&nsec).unwrap();
        assert_eq!(keys.public_key_hex(), again.public_key_hex());
        assert_eq!(
            secret_key_to_hex(&nsec).unwrap(),
            keys.secret_key_hex()
        );
    }

    #[test]
    fn key_normalization_rejects_garbage() {
        assert!(public_key_to_hex("not_a_key").is_err());
        assert!(secret_key_to_hex("npub1abc").is_err());
    }

    #[test]
    fn debug_hides_secret() {
        let keys = KeyPair::generate().unwrap();
        let debug = format!("{:?}", keys);
        assert!(!debug.contains(keys.secret_key_hex()));
    }
}
