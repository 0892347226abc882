/*
 * event.rs
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

//! NIP-01 event: the fundamental data structure in Nostr. The event id
//! is the SHA-256 of the canonical serialization
//! `[0,pubkey,created_at,kind,tags,content]` — minimal JSON, UTF-8, no
//! forward-slash escaping. A signed event is immutable; edits are new
//! events.

use secp256k1::{schnorr, Secp256k1, XOnlyPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Error;
use crate::hex;

/// Profile metadata (NIP-01).
pub const KIND_METADATA: u16 = 0;
/// Plain text note (NIP-01).
pub const KIND_TEXT_NOTE: u16 = 1;
/// NIP-59 seal.
pub const KIND_SEAL: u16 = 13;
/// NIP-17 chat message rumor.
pub const KIND_CHAT_MESSAGE: u16 = 14;
/// NIP-17 file message rumor.
pub const KIND_FILE_MESSAGE: u16 = 15;
/// NIP-59 gift wrap.
pub const KIND_GIFT_WRAP: u16 = 1059;
/// NIP-57 zap request.
pub const KIND_ZAP_REQUEST: u16 = 9734;
/// NIP-57 zap receipt.
pub const KIND_ZAP_RECEIPT: u16 = 9735;
/// NIP-51 mute list.
pub const KIND_MUTE_LIST: u16 = 10000;
/// NIP-51 pin list.
pub const KIND_PIN_LIST: u16 = 10001;
/// NIP-65 relay list metadata.
pub const KIND_RELAY_LIST: u16 = 10002;
/// NIP-42 client authentication.
pub const KIND_CLIENT_AUTH: u16 = 22242;
/// NIP-46 remote signing RPC.
pub const KIND_NOSTR_CONNECT: u16 = 24133;
/// NIP-98 HTTP authentication.
pub const KIND_HTTP_AUTH: u16 = 27235;
/// NIP-51 follow set.
pub const KIND_FOLLOW_SET: u16 = 30000;
/// NIP-51 bookmark set.
pub const KIND_BOOKMARK_SET: u16 = 30003;
/// NIP-23 long-form article.
pub const KIND_ARTICLE: u16 = 30023;
/// NIP-23 article draft.
pub const KIND_ARTICLE_DRAFT: u16 = 30024;

/// Hard cap on `content` (256 KiB of UTF-8).
pub const MAX_CONTENT_LEN: usize = 262_144;

/// NIP-01 event. Hex fields are lower-case on emit and tolerated
/// case-insensitively on parse. `id` and `sig` are empty strings while
/// the event is unsigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: String,
    pub pubkey: String,
    pub created_at: i64,
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    #[serde(default)]
    pub sig: String,
}

impl Event {
    /// Canonical serialization for id computation and signing:
    /// `[0,pubkey,created_at,kind,tags,content]` with no insignificant
    /// whitespace and no escaped forward slashes.
    pub fn canonical_serialization(&self) -> String {
        let mut json = String::with_capacity(128 + self.content.len());
        json.push_str("[0,\"");
        json.push_str(&self.pubkey.to_lowercase());
        json.push_str("\",");
        json.push_str(&self.created_at.to_string());
        json.push(',');
        json.push_str(&self.kind.to_string());
        json.push_str(",[");
        for (i, tag) in self.tags.iter().enumerate() {
            if i > 0 {
                json.push(',');
            }
            json.push('[');
            for (j, item) in tag.iter().enumerate() {
                if j > 0 {
                    json.push(',');
                }
                json.push('"');
                escape_json_into(item, &mut json);
                json.push('"');
            }
            json.push(']');
        }
        json.push_str("],\"");
        escape_json_into(&self.content, &mut json);
        json.push_str("\"]");
        json
    }

    /// SHA-256 of the canonical serialization, as lower-case hex.
    pub fn compute_id(&self) -> String {
        let digest = Sha256::digest(self.canonical_serialization().as_bytes());
        hex::encode(&digest)
    }

    pub fn is_signed(&self) -> bool {
        !self.sig.is_empty()
    }

    /// Structural checks that run before any cryptography: hex field
    /// shapes, content size, tag arity.
    pub fn validate(&self) -> Result<(), Error> {
        if !hex::is_valid_hex_key(&self.pubkey) {
            return Err(Error::Validation(String::from("pubkey must be 64 hex characters")));
        }
        if !self.id.is_empty() && !hex::is_valid_hex_key(&self.id) {
            return Err(Error::Validation(String::from("event id must be 64 hex characters")));
        }
        if !self.sig.is_empty() && !hex::is_valid_hex_sig(&self.sig) {
            return Err(Error::Validation(String::from("signature must be 128 hex characters")));
        }
        if self.content.len() > MAX_CONTENT_LEN {
            return Err(Error::Validation(format!(
                "content too large: {} bytes (max {})",
                self.content.len(),
                MAX_CONTENT_LEN
            )));
        }
        if self.tags.iter().any(|t| t.is_empty()) {
            return Err(Error::Validation(String::from("tags must have at least one element")));
        }
        Ok(())
    }

    /// Full verification of a received event: recompute the id from the
    /// canonical serialization, then check the BIP-340 signature over it.
    pub fn verify(&self) -> Result<(), Error> {
        self.validate()?;
        let computed = self.compute_id();
        if !computed.eq_ignore_ascii_case(&self.id) {
            return Err(Error::Validation(String::from("event id mismatch")));
        }
        let pubkey_bytes = hex::decode32(&self.pubkey)?;
        let pubkey = XOnlyPublicKey::from_slice(&pubkey_bytes)
            .map_err(|e| Error::Crypto(format!("invalid public key: {}", e)))?;
        let sig_bytes = hex::decode64(&self.sig)?;
        let signature = schnorr::Signature::from_slice(&sig_bytes)
            .map_err(|e| Error::Crypto(format!("invalid signature: {}", e)))?;
        let digest = hex::decode32(&computed)?;
        let message = secp256k1::Message::from_digest_slice(&digest)
            .map_err(|e| Error::Crypto(format!("message error: {}", e)))?;
        let secp = Secp256k1::verification_only();
        secp.verify_schnorr(&signature, &message, &pubkey)
            .map_err(|_| Error::Crypto(String::from("signature verification failed")))
    }

    /// First value of the first tag named `name`.
    pub fn tag_value(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.len() >= 2 && t[0] == name)
            .map(|t| t[1].as_str())
    }

    /// First value of every tag named `name`, in tag order.
    pub fn tag_values<'a>(&'a self, name: &str) -> Vec<&'a str> {
        self.tags
            .iter()
            .filter(|t| t.len() >= 2 && t[0] == name)
            .map(|t| t[1].as_str())
            .collect()
    }

    /// Full tags named `name`, in tag order.
    pub fn tags_named<'a>(&'a self, name: &str) -> Vec<&'a Vec<String>> {
        self.tags.iter().filter(|t| !t.is_empty() && t[0] == name).collect()
    }

    /// `d`-tag value for parameterized replaceable events.
    pub fn identifier(&self) -> Option<&str> {
        self.tag_value("d")
    }

    /// `expiration` tag as unix seconds, if present and numeric.
    pub fn expiration(&self) -> Option<i64> {
        self.tag_value("expiration").and_then(|v| v.parse().ok())
    }

    /// Replaceable-event coordinate `kind:pubkey:d` for `a` tags.
    pub fn coordinate(&self) -> Option<String> {
        if !is_parameterized_replaceable_kind(self.kind) {
            return None;
        }
        Some(format!(
            "{}:{}:{}",
            self.kind,
            self.pubkey.to_lowercase(),
            self.identifier().unwrap_or("")
        ))
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        let event: Event = serde_json::from_str(json)?;
        event.validate()?;
        Ok(event)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Regular events: relays store every copy.
pub fn is_regular_kind(kind: u16) -> bool {
    kind <= 999
}

/// Replaceable: relays keep only the latest per (pubkey, kind).
pub fn is_replaceable_kind(kind: u16) -> bool {
    (1000..=9999).contains(&kind)
}

/// Ephemeral: relays may not store at all.
pub fn is_ephemeral_kind(kind: u16) -> bool {
    (10000..=19999).contains(&kind)
}

/// Parameterized replaceable: identity is (pubkey, kind, `d` value).
pub fn is_parameterized_replaceable_kind(kind: u16) -> bool {
    (20000..=39999).contains(&kind)
}

/// Seconds since the unix epoch, truncated.
pub(crate) fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Minimal JSON string escaping: `"` `\` and the named control escapes,
/// other control characters as `\uXXXX`. Forward slashes pass through.
pub(crate) fn escape_json_into(input: &str, out: &mut String) {
    for c in input.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;

    fn sample_event() -> Event {
        Event {
            id: String::new(),
            pubkey: String::from("3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d"),
            created_at: 1_700_000_000,
            kind: KIND_TEXT_NOTE,
            tags: vec![vec![String::from("t"), String::from("rust")]],
            content: String::from("Hello"),
            sig: String::new(),
        }
    }

    #[test]
    fn canonical_shape() {
        let event = sample_event();
        assert_eq!(
            event.canonical_serialization(),
            "[0,\"3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d\",1700000000,1,[[\"t\",\"rust\"]],\"Hello\"]"
        );
    }

    #[test]
    fn no_forward_slash_escaping() {
        let mut event = sample_event();
        event.content = String::from("https://example.com/a");
        let json = event.canonical_serialization();
        assert!(json.contains("https://example.com/a"));
        assert!(!json.contains("\\/"));
    }

    #[test]
    fn control_chars_escaped() {
        let mut event = sample_event();
        event.content = String::from("a\nb\u{1}c");
        let json = event.canonical_serialization();
        assert!(json.contains("a\\nb\\u0001c"));
    }

    #[test]
    fn id_is_deterministic_and_content_sensitive() {
        let event = sample_event();
        let id1 = event.compute_id();
        assert_eq!(id1, event.compute_id());
        let mut changed = event.clone();
        changed.content = String::from("Hello!");
        assert_ne!(id1, changed.compute_id());
    }

    #[test]
    fn tag_order_is_identity() {
        let mut event = sample_event();
        let id1 = event.compute_id();
        event.tags.insert(0, vec![String::from("t"), String::from("nostr")]);
        let id2 = event.compute_id();
        event.tags.swap(0, 1);
        assert_ne!(id1, id2);
        assert_ne!(id2, event.compute_id());
    }

    #[test]
    fn verify_signed_event_and_tamper() {
        let keys = KeyPair::generate().unwrap();
        let mut event = sample_event();
        event.pubkey = keys.public_key_hex().to_string();
        keys.sign_event(&mut event).unwrap();
        event.verify().unwrap();

        let mut tampered = event.clone();
        tampered.content = String::from("HELLO");
        assert!(matches!(tampered.verify(), Err(Error::Validation(_))));

        let mut bad_sig = event.clone();
        // flip one hex digit of the signature
        let flipped = if bad_sig.sig.starts_with('a') { "b" } else { "a" };
        bad_sig.sig.replace_range(0..1, flipped);
        assert!(matches!(bad_sig.verify(), Err(Error::Crypto(_))));
    }

    #[test]
    fn wire_json_roundtrip() {
        let keys = KeyPair::generate().unwrap();
        let mut event = sample_event();
        event.pubkey = keys.public_key_hex().to_string();
        keys.sign_event(&mut event).unwrap();
        let json = event.to_json().unwrap();
        let back = Event::from_json(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn validate_rejects_oversized_content() {
        let mut event = sample_event();
        event.content = "x".repeat(MAX_CONTENT_LEN + 1);
        assert!(matches!(event.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn validate_rejects_empty_tag() {
        let mut event = sample_event();
        event.tags.push(Vec::new());
        assert!(event.validate().is_err());
    }

    #[test]
    fn kind_ranges() {
        assert!(is_regular_kind(1));
        assert!(is_replaceable_kind(1059));
        assert!(is_ephemeral_kind(10002));
        assert!(is_parameterized_replaceable_kind(30023));
        assert!(!is_parameterized_replaceable_kind(40000));
    }

    #[test]
    fn accessors() {
        let mut event = sample_event();
        event.kind = 30023;
        event.tags = vec![
            vec![String::from("d"), String::from("post-1")],
            vec![String::from("t"), String::from("rust")],
            vec![String::from("t"), String::from("nostr")],
            vec![String::from("expiration"), String::from("1700000123")],
        ];
        assert_eq!(event.identifier(), Some("post-1"));
        assert_eq!(event.tag_values("t"), vec!["rust", "nostr"]);
        assert_eq!(event.expiration(), Some(1_700_000_123));
        assert_eq!(
            event.coordinate().unwrap(),
            format!("30023:{}:post-1", event.pubkey)
        );
    }
}
