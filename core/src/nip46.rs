/*
 * nip46.rs
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

//! NIP-46 remote signing (Nostr Connect): bunker URI plus the JSON-RPC
//! request/response shapes carried in kind-24133 events whose content
//! is NIP-44-encrypted between the client key and the remote signer.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::event::{unix_now, Event, KIND_NOSTR_CONNECT};
use crate::hex;
use crate::keys::KeyPair;
use crate::nip21::parse_query;
use crate::nip44;

pub const METHOD_CONNECT: &str = "connect";
pub const METHOD_GET_PUBLIC_KEY: &str = "get_public_key";
pub const METHOD_SIGN_EVENT: &str = "sign_event";
pub const METHOD_PING: &str = "ping";
pub const METHOD_NIP44_ENCRYPT: &str = "nip44_encrypt";
pub const METHOD_NIP44_DECRYPT: &str = "nip44_decrypt";

/// `bunker://<signer-pubkey>?relay=…(&relay=…)*(&secret=…)?`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BunkerUri {
    pub signer_pubkey: String,
    pub relays: Vec<String>,
    pub secret: Option<String>,
}

impl BunkerUri {
    pub fn parse(uri: &str) -> Result<Self, Error> {
        let rest = uri
            .trim()
            .strip_prefix("bunker://")
            .ok_or_else(|| Error::Validation(String::from("URI must start with bunker://")))?;
        let (pubkey, query) = match rest.find('?') {
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => (rest, ""),
        };
        if !hex::is_valid_hex_key(pubkey) {
            return Err(Error::Validation(String::from(
                "signer pubkey must be 64 hex characters",
            )));
        }
        let mut relays = Vec::new();
        let mut secret = None;
        for (key, value) in parse_query(query) {
            match key.as_str() {
                "relay" if !value.is_empty() => relays.push(value),
                "secret" if !value.is_empty() => secret = Some(value),
                _ => {}
            }
        }
        if relays.is_empty() {
            return Err(Error::Validation(String::from(
                "bunker URI requires at least one relay",
            )));
        }
        Ok(Self {
            signer_pubkey: pubkey.to_lowercase(),
            relays,
            secret,
        })
    }
}

impl std::fmt::Display for BunkerUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bunker://{}", self.signer_pubkey)?;
        for (i, relay) in self.relays.iter().enumerate() {
            write!(f, "{}relay={}", if i == 0 { '?' } else { '&' }, relay)?;
        }
        if let Some(ref secret) = self.secret {
            write!(f, "&secret={}", secret)?;
        }
        Ok(())
    }
}

/// RPC request, serialized into the encrypted event content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    pub method: String,
    pub params: Vec<String>,
}

impl Request {
    pub fn new(method: &str, params: Vec<String>) -> Result<Self, Error> {
        let mut id_bytes = [0u8; 8];
        getrandom::getrandom(&mut id_bytes)
            .map_err(|e| Error::Crypto(format!("RNG error: {}", e)))?;
        Ok(Self {
            id: hex::encode(&id_bytes),
            method: method.to_string(),
            params,
        })
    }

    pub fn connect(signer_pubkey: &str, secret: Option<&str>) -> Result<Self, Error> {
        let mut params = vec![signer_pubkey.to_lowercase()];
        if let Some(secret) = secret {
            params.push(secret.to_string());
        }
        Self::new(METHOD_CONNECT, params)
    }

    pub fn sign_event(unsigned: &Event) -> Result<Self, Error> {
        Self::new(METHOD_SIGN_EVENT, vec![unsigned.to_json()?])
    }

    pub fn ping() -> Result<Self, Error> {
        Self::new(METHOD_PING, Vec::new())
    }
}

/// RPC response. `result` and `error` are mutually exclusive in
/// practice, but both fields survive verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Wrap a request in a kind-24133 event addressed to the signer. The
/// content is NIP-44 ciphertext between the local client key and the
/// signer's pubkey.
pub fn build_request_event(
    request: &Request,
    client: &KeyPair,
    signer_pubkey: &str,
) -> Result<Event, Error> {
    let key = nip44::conversation_key(client, signer_pubkey)?;
    let content = nip44::encrypt(&serde_json::to_string(request)?, &key)?;
    let mut event = Event {
        id: String::new(),
        pubkey: client.public_key_hex().to_string(),
        created_at: unix_now(),
        kind: KIND_NOSTR_CONNECT,
        tags: vec![vec![String::from("p"), signer_pubkey.to_lowercase()]],
        content,
        sig: String::new(),
    };
    client.sign_event(&mut event)?;
    Ok(event)
}

/// Decrypt a kind-24133 event from the signer and parse the response.
pub fn decrypt_response(event: &Event, client: &KeyPair) -> Result<Response, Error> {
    if event.kind != KIND_NOSTR_CONNECT {
        return Err(Error::Validation(format!(
            "expected kind {}, got {}",
            KIND_NOSTR_CONNECT, event.kind
        )));
    }
    let key = nip44::conversation_key(client, &event.pubkey)?;
    let plaintext = nip44::decrypt(&event.content, &key)?;
    Ok(serde_json::from_str(&plaintext)?)
}

/// Decrypt a kind-24133 event on the signer side and parse the request.
pub fn decrypt_request(event: &Event, signer: &KeyPair) -> Result<Request, Error> {
    if event.kind != KIND_NOSTR_CONNECT {
        return Err(Error::Validation(format!(
            "expected kind {}, got {}",
            KIND_NOSTR_CONNECT, event.kind
        )));
    }
    let key = nip44::conversation_key(signer, &event.pubkey)?;
    let plaintext = nip44::decrypt(&event.content, &key)?;
    Ok(serde_json::from_str(&plaintext)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNER: &str = "3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d";

    #[test]
    fn bunker_uri_roundtrip() {
        let uri = BunkerUri {
            signer_pubkey: SIGNER.to_string(),
            relays: vec![String::from("wss://relay.nsec.app"), String::from("wss://nos.lol")],
            secret: Some(String::from("s3cret")),
        };
        let text = uri.to_string();
        assert!(text.starts_with("bunker://"));
        assert_eq!(BunkerUri::parse(&text).unwrap(), uri);
    }

    #[test]
    fn bunker_uri_with_encoded_relay() {
        let uri = format!("bunker://{}?relay=wss%3A%2F%2Frelay.nsec.app", SIGNER);
        let parsed = BunkerUri::parse(&uri).unwrap();
        assert_eq!(parsed.relays, vec!["wss://relay.nsec.app"]);
        assert_eq!(parsed.secret, None);
    }

    #[test]
    fn bunker_uri_requires_relay_and_hex_pubkey() {
        assert!(BunkerUri::parse(&format!("bunker://{}", SIGNER)).is_err());
        assert!(BunkerUri::parse("bunker://nothex?relay=wss://nos.lol").is_err());
        assert!(BunkerUri::parse(&format!("nostr://{}?relay=x", SIGNER)).is_err());
    }

    #[test]
    fn request_event_roundtrip() {
        let client = KeyPair::generate().unwrap();
        let signer = KeyPair::generate().unwrap();
        let request = Request::connect(signer.public_key_hex(), Some("s3cret")).unwrap();
        let event = build_request_event(&request, &client, signer.public_key_hex()).unwrap();

        assert_eq!(event.kind, KIND_NOSTR_CONNECT);
        assert_eq!(event.tag_value("p"), Some(signer.public_key_hex()));
        event.verify().unwrap();

        let decrypted = decrypt_request(&event, &signer).unwrap();
        assert_eq!(decrypted, request);
    }

    #[test]
    fn response_roundtrip() {
        let client = KeyPair::generate().unwrap();
        let signer = KeyPair::generate().unwrap();
        let response = Response {
            id: String::from("abcd"),
            result: Some(String::from("ack")),
            error: None,
        };
        let key = nip44::conversation_key(&signer, client.public_key_hex()).unwrap();
        let mut event = Event {
            id: String::new(),
            pubkey: signer.public_key_hex().to_string(),
            created_at: unix_now(),
            kind: KIND_NOSTR_CONNECT,
            tags: vec![vec![String::from("p"), client.public_key_hex().to_string()]],
            content: nip44::encrypt(&serde_json::to_string(&response).unwrap(), &key).unwrap(),
            sig: String::new(),
        };
        signer.sign_event(&mut event).unwrap();
        assert_eq!(decrypt_response(&event, &client).unwrap(), response);
    }

    #[test]
    fn request_ids_are_unique() {
        let a = Request::ping().unwrap();
        let b = Request::ping().unwrap();
        assert_ne!(a.id, b.id);
    }
}
