/*
 * nip98.rs
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

//! Signed-event authentication shapes: NIP-98 HTTP auth (kind 27235,
//! sent as an `Authorization: Nostr <base64(event)>` header) and the
//! NIP-42 relay auth event (kind 22242) built from an AUTH challenge.
//! The relay session never sends these on its own; callers do.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use sha2::{Digest, Sha256};

use crate::error::Error;
use crate::event::{unix_now, Event, KIND_CLIENT_AUTH, KIND_HTTP_AUTH};
use crate::hex;
use crate::keys::KeyPair;

/// Accepted clock skew when verifying an HTTP auth event.
const HTTP_AUTH_WINDOW: i64 = 60;

/// Kind-27235 event for one HTTP request: absolute `u`, uppercase
/// `method`, and a `payload` tag with the SHA-256 of the body when one
/// is sent.
pub fn create_http_auth_event(
    url: &str,
    method: &str,
    payload: Option<&[u8]>,
    keys: &KeyPair,
) -> Result<Event, Error> {
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(Error::Validation(String::from("u tag requires an absolute http(s) URL")));
    }
    let mut tags = vec![
        vec![String::from("u"), url.to_string()],
        vec![String::from("method"), method.to_uppercase()],
    ];
    if let Some(payload) = payload {
        tags.push(vec![
            String::from("payload"),
            hex::encode(&Sha256::digest(payload)),
        ]);
    }
    let mut event = Event {
        id: String::new(),
        pubkey: keys.public_key_hex().to_string(),
        created_at: unix_now(),
        kind: KIND_HTTP_AUTH,
        tags,
        content: String::new(),
        sig: String::new(),
    };
    keys.sign_event(&mut event)?;
    Ok(event)
}

/// `Nostr <base64(event-json)>`, the Authorization header value.
pub fn auth_header_value(event: &Event) -> Result<String, Error> {
    Ok(format!("Nostr {}", BASE64.encode(event.to_json()?)))
}

/// Server-side check of a kind-27235 event against the request line.
pub fn verify_http_auth_event(
    event: &Event,
    url: &str,
    method: &str,
    now: i64,
) -> Result<(), Error> {
    if event.kind != KIND_HTTP_AUTH {
        return Err(Error::Validation(format!(
            "expected kind {}, got {}",
            KIND_HTTP_AUTH, event.kind
        )));
    }
    event.verify()?;
    if event.tag_value("u") != Some(url) {
        return Err(Error::Validation(String::from("u tag does not match request URL")));
    }
    if event.tag_value("method").map(str::to_uppercase) != Some(method.to_uppercase()) {
        return Err(Error::Validation(String::from("method tag does not match request")));
    }
    if (now - event.created_at).abs() > HTTP_AUTH_WINDOW {
        return Err(Error::Validation(String::from("auth event outside freshness window")));
    }
    Ok(())
}

/// Kind-22242 response to a relay AUTH challenge (NIP-42). The caller
/// decides when and where to send it.
pub fn create_client_auth_event(
    relay_url: &str,
    challenge: &str,
    keys: &KeyPair,
) -> Result<Event, Error> {
    let mut event = Event {
        id: String::new(),
        pubkey: keys.public_key_hex().to_string(),
        created_at: unix_now(),
        kind: KIND_CLIENT_AUTH,
        tags: vec![
            vec![String::from("relay"), relay_url.to_string()],
            vec![String::from("challenge"), challenge.to_string()],
        ],
        content: String::new(),
        sig: String::new(),
    };
    keys.sign_event(&mut event)?;
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_auth_roundtrip() {
        let keys = KeyPair::generate().unwrap();
        let url = "https://media.example.com/upload";
        let body = b"file-bytes";
        let event = create_http_auth_event(url, "post", Some(body), &keys).unwrap();

        assert_eq!(event.kind, KIND_HTTP_AUTH);
        assert_eq!(event.tag_value("u"), Some(url));
        assert_eq!(event.tag_value("method"), Some("POST"));
        assert_eq!(
            event.tag_value("payload"),
            Some(hex::encode(&Sha256::digest(body)).as_str())
        );
        verify_http_auth_event(&event, url, "POST", event.created_at).unwrap();

        let header = auth_header_value(&event).unwrap();
        let encoded = header.strip_prefix("Nostr ").unwrap();
        let decoded = Event::from_json(
            std::str::from_utf8(&BASE64.decode(encoded).unwrap()).unwrap(),
        )
        .unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn http_auth_verification_failures() {
        let keys = KeyPair::generate().unwrap();
        let url = "https://media.example.com/upload";
        let event = create_http_auth_event(url, "GET", None, &keys).unwrap();

        assert!(verify_http_auth_event(&event, "https://other.example.com/", "GET", event.created_at).is_err());
        assert!(verify_http_auth_event(&event, url, "POST", event.created_at).is_err());
        assert!(verify_http_auth_event(&event, url, "GET", event.created_at + 120).is_err());
    }

    #[test]
    fn http_auth_rejects_relative_url() {
        let keys = KeyPair::generate().unwrap();
        assert!(create_http_auth_event("/upload", "GET", None, &keys).is_err());
    }

    #[test]
    fn client_auth_shape() {
        let keys = KeyPair::generate().unwrap();
        let event = create_client_auth_event("wss://relay.example.com", "rnd-challenge", &keys).unwrap();
        assert_eq!(event.kind, KIND_CLIENT_AUTH);
        assert_eq!(event.tag_value("relay"), Some("wss://relay.example.com"));
        assert_eq!(event.tag_value("challenge"), Some("rnd-challenge"));
        event.verify().unwrap();
    }
}
