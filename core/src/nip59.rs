/*
 * nip59.rs
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

//! NIP-59 gift wrap: rumor (unsigned) → seal (kind 13, signed by the
//! real sender) → gift wrap (kind 1059, signed by a one-shot ephemeral
//! key). Timestamps on seal and wrap are randomized into the past two
//! days so relays cannot correlate layers. Unwrapping enforces the
//! nesting and binds the seal author to the rumor author.

use crate::error::Error;
use crate::event::{unix_now, Event, KIND_CHAT_MESSAGE, KIND_FILE_MESSAGE, KIND_GIFT_WRAP, KIND_SEAL};
use crate::hex;
use crate::keys::KeyPair;
use crate::nip44;

/// Seal/wrap timestamps are drawn uniformly from the last two days.
const TIMESTAMP_WINDOW: i64 = 2 * 24 * 60 * 60;

fn random_past_timestamp() -> i64 {
    let jitter = (rand::random::<u64>() % TIMESTAMP_WINDOW as u64) as i64;
    unix_now().saturating_sub(jitter)
}

/// Event JSON with object keys sorted, the canonical form for the
/// encrypted seal/rumor payloads.
fn sorted_event_json(event: &Event) -> Result<String, Error> {
    // serde_json maps are BTree-backed, so a Value round-trip sorts keys
    let value = serde_json::to_value(event)?;
    Ok(serde_json::to_string(&value)?)
}

/// Build an unsigned rumor carrying the real sender pubkey. The id is
/// computed so receivers can reference it; `sig` stays empty.
pub fn create_rumor(
    kind: u16,
    content: &str,
    tags: Vec<Vec<String>>,
    sender_pubkey_hex: &str,
) -> Result<Event, Error> {
    if !hex::is_valid_hex_key(sender_pubkey_hex) {
        return Err(Error::Validation(String::from("pubkey must be 64 hex characters")));
    }
    let mut rumor = Event {
        id: String::new(),
        pubkey: sender_pubkey_hex.to_lowercase(),
        created_at: unix_now(),
        kind,
        tags,
        content: content.to_string(),
        sig: String::new(),
    };
    rumor.validate()?;
    rumor.id = rumor.compute_id();
    Ok(rumor)
}

/// Kind-13 seal: the rumor JSON encrypted sender→recipient, signed by
/// the sender. Tags stay empty; anything else would leak metadata.
pub fn create_seal(
    rumor: &Event,
    sender: &KeyPair,
    recipient_pubkey_hex: &str,
) -> Result<Event, Error> {
    let key = nip44::conversation_key(sender, recipient_pubkey_hex)?;
    let encrypted = nip44::encrypt(&sorted_event_json(rumor)?, &key)?;
    let mut seal = Event {
        id: String::new(),
        pubkey: sender.public_key_hex().to_string(),
        created_at: random_past_timestamp(),
        kind: KIND_SEAL,
        tags: Vec::new(),
        content: encrypted,
        sig: String::new(),
    };
    sender.sign_event(&mut seal)?;
    Ok(seal)
}

/// Kind-1059 gift wrap around an unsigned rumor: seal it, then encrypt
/// the seal under a fresh ephemeral key that signs the wrap and is
/// dropped afterwards. `relay_hint` lands in the `p` tag's relay slot;
/// `expiration` adds the NIP-40 tag.
pub fn create_gift_wrap(
    rumor: &Event,
    sender: &KeyPair,
    recipient_pubkey_hex: &str,
    relay_hint: Option<&str>,
    expiration: Option<i64>,
) -> Result<Event, Error> {
    if rumor.is_signed() {
        return Err(Error::Validation(String::from(
            "rumor must be unsigned; a signed rumor would be provably published",
        )));
    }
    let seal = create_seal(rumor, sender, recipient_pubkey_hex)?;
    wrap_seal(&seal, recipient_pubkey_hex, relay_hint, expiration)
}

/// Encrypt an existing seal to `recipient` under an ephemeral key.
pub fn wrap_seal(
    seal: &Event,
    recipient_pubkey_hex: &str,
    relay_hint: Option<&str>,
    expiration: Option<i64>,
) -> Result<Event, Error> {
    let ephemeral = KeyPair::generate()?;
    let key = nip44::conversation_key(&ephemeral, recipient_pubkey_hex)?;
    let encrypted = nip44::encrypt(&sorted_event_json(seal)?, &key)?;

    let mut p_tag = vec![String::from("p"), recipient_pubkey_hex.to_lowercase()];
    if let Some(relay) = relay_hint {
        p_tag.push(relay.to_string());
    }
    let mut tags = vec![p_tag];
    if let Some(expiration) = expiration {
        tags.push(vec![String::from("expiration"), expiration.to_string()]);
    }

    let mut wrap = Event {
        id: String::new(),
        pubkey: ephemeral.public_key_hex().to_string(),
        created_at: random_past_timestamp(),
        kind: KIND_GIFT_WRAP,
        tags,
        content: encrypted,
        sig: String::new(),
    };
    ephemeral.sign_event(&mut wrap)?;
    Ok(wrap)
}

/// Build a NIP-17 chat DM (kind-14 rumor) and wrap it twice: once for
/// the recipient, once for the sender so their own history stays
/// readable. The same applies to kind-15 file messages.
pub fn wrap_dm(
    plaintext: &str,
    sender: &KeyPair,
    recipient_pubkey_hex: &str,
    relay_hint: Option<&str>,
) -> Result<(Event, Event), Error> {
    let tags = vec![vec![String::from("p"), recipient_pubkey_hex.to_lowercase()]];
    let rumor = create_rumor(KIND_CHAT_MESSAGE, plaintext, tags, sender.public_key_hex())?;
    wrap_for_both(&rumor, sender, recipient_pubkey_hex, relay_hint)
}

/// Wrap a DM rumor (kind 14/15) for the recipient and for the sender.
pub fn wrap_for_both(
    rumor: &Event,
    sender: &KeyPair,
    recipient_pubkey_hex: &str,
    relay_hint: Option<&str>,
) -> Result<(Event, Event), Error> {
    if rumor.kind != KIND_CHAT_MESSAGE && rumor.kind != KIND_FILE_MESSAGE {
        return Err(Error::Validation(format!(
            "self-copy wrapping applies to DM kinds 14/15, got {}",
            rumor.kind
        )));
    }
    let for_recipient = create_gift_wrap(rumor, sender, recipient_pubkey_hex, relay_hint, None)?;
    let for_sender = create_gift_wrap(rumor, sender, sender.public_key_hex(), relay_hint, None)?;
    Ok((for_recipient, for_sender))
}

/// Reverse the layering with the recipient's key. Returns (seal, rumor).
pub fn unwrap_gift_wrap(gift_wrap: &Event, recipient: &KeyPair) -> Result<(Event, Event), Error> {
    if gift_wrap.kind != KIND_GIFT_WRAP {
        return Err(Error::Validation(format!(
            "expected kind {}, got {}",
            KIND_GIFT_WRAP, gift_wrap.kind
        )));
    }
    let outer_key = nip44::conversation_key(recipient, &gift_wrap.pubkey)?;
    let seal_json = nip44::decrypt(&gift_wrap.content, &outer_key)?;
    let seal = Event::from_json(&seal_json)?;
    if seal.kind != KIND_SEAL {
        return Err(Error::Validation(format!(
            "expected seal kind {}, got {}",
            KIND_SEAL, seal.kind
        )));
    }
    seal.verify()?;

    let inner_key = nip44::conversation_key(recipient, &seal.pubkey)?;
    let rumor_json = nip44::decrypt(&seal.content, &inner_key)?;
    let rumor = Event::from_json(&rumor_json)?;
    if !rumor.pubkey.eq_ignore_ascii_case(&seal.pubkey) {
        return Err(Error::Validation(String::from(
            "rumor pubkey does not match seal pubkey",
        )));
    }
    Ok((seal, rumor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Nip44Error;

    #[test]
    fn gift_wrap_roundtrip() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();

        let rumor = create_rumor(KIND_CHAT_MESSAGE, "Hello Bob!", Vec::new(), alice.public_key_hex()).unwrap();
        let wrap = create_gift_wrap(&rumor, &alice, bob.public_key_hex(), None, None).unwrap();

        assert_eq!(wrap.kind, KIND_GIFT_WRAP);
        assert_ne!(wrap.pubkey, alice.public_key_hex());
        assert_eq!(wrap.tag_value("p"), Some(bob.public_key_hex()));
        wrap.verify().unwrap();

        let (seal, unwrapped) = unwrap_gift_wrap(&wrap, &bob).unwrap();
        assert_eq!(seal.kind, KIND_SEAL);
        assert!(seal.tags.is_empty());
        assert_eq!(seal.pubkey, alice.public_key_hex());
        assert_eq!(unwrapped, rumor);
    }

    #[test]
    fn wrong_recipient_fails_with_mac_error() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let charlie = KeyPair::generate().unwrap();

        let (wrap, _) = wrap_dm("Secret", &alice, bob.public_key_hex(), None).unwrap();
        assert!(matches!(
            unwrap_gift_wrap(&wrap, &charlie),
            Err(Error::Nip44(Nip44Error::MacMismatch))
        ));
    }

    #[test]
    fn dm_self_copy_is_readable_by_sender() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();

        let (for_bob, for_alice) = wrap_dm("Hello Bob!", &alice, bob.public_key_hex(), None).unwrap();
        let (_, rumor_bob) = unwrap_gift_wrap(&for_bob, &bob).unwrap();
        let (_, rumor_alice) = unwrap_gift_wrap(&for_alice, &alice).unwrap();
        assert_eq!(rumor_bob.content, "Hello Bob!");
        assert_eq!(rumor_bob.id, rumor_alice.id);
        assert_eq!(rumor_bob.kind, KIND_CHAT_MESSAGE);
    }

    #[test]
    fn signed_rumor_rejected() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let mut rumor = create_rumor(KIND_CHAT_MESSAGE, "x", Vec::new(), alice.public_key_hex()).unwrap();
        alice.sign_event(&mut rumor).unwrap();
        assert!(create_gift_wrap(&rumor, &alice, bob.public_key_hex(), None, None).is_err());
    }

    #[test]
    fn timestamps_randomized_into_past() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let rumor = create_rumor(KIND_CHAT_MESSAGE, "x", Vec::new(), alice.public_key_hex()).unwrap();
        let wrap = create_gift_wrap(&rumor, &alice, bob.public_key_hex(), None, None).unwrap();
        let now = unix_now();
        assert!(wrap.created_at <= now);
        assert!(wrap.created_at >= now - TIMESTAMP_WINDOW - 5);
    }

    #[test]
    fn relay_hint_and_expiration_tags() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();
        let rumor = create_rumor(KIND_CHAT_MESSAGE, "x", Vec::new(), alice.public_key_hex()).unwrap();
        let wrap = create_gift_wrap(
            &rumor,
            &alice,
            bob.public_key_hex(),
            Some("wss://dm.example.com"),
            Some(1_900_000_000),
        )
        .unwrap();
        assert_eq!(
            wrap.tags[0],
            vec!["p", bob.public_key_hex(), "wss://dm.example.com"]
        );
        assert_eq!(wrap.expiration(), Some(1_900_000_000));
    }

    #[test]
    fn seal_author_must_match_rumor_author() {
        let alice = KeyPair::generate().unwrap();
        let mallory = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();

        // Mallory seals a rumor claiming to be from Alice.
        let rumor = create_rumor(KIND_CHAT_MESSAGE, "fake", Vec::new(), alice.public_key_hex()).unwrap();
        let seal = create_seal(&rumor, &mallory, bob.public_key_hex()).unwrap();
        let wrap = wrap_seal(&seal, bob.public_key_hex(), None, None).unwrap();
        assert!(matches!(
            unwrap_gift_wrap(&wrap, &bob),
            Err(Error::Validation(_))
        ));
    }
}
