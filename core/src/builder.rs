/*
 * builder.rs
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

//! Chainable event builder. Collects kind, content, tags and an
//! optional timestamp, then signs in one step: snapshot `created_at`,
//! compute the canonical id, Schnorr-sign the digest.

use crate::error::Error;
use crate::event::{unix_now, Event, KIND_TEXT_NOTE};
use crate::keys::KeyPair;

#[derive(Debug, Clone, Default)]
pub struct EventBuilder {
    kind: u16,
    content: String,
    tags: Vec<Vec<String>>,
    created_at: Option<i64>,
}

impl EventBuilder {
    pub fn new(kind: u16) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Kind-1 text note.
    pub fn text_note(content: impl Into<String>) -> Self {
        Self::new(KIND_TEXT_NOTE).content(content)
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Caller-supplied timestamp; "now" when omitted. Producers may
    /// legitimately choose past or future values.
    pub fn created_at(mut self, created_at: i64) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Append one tag verbatim.
    pub fn tag(mut self, tag: Vec<String>) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = Vec<String>>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// `e` tag referencing another event, with optional relay hint and
    /// marker (`reply`, `root`, `mention`).
    pub fn event_ref(self, event_id: &str, relay: Option<&str>, marker: Option<&str>) -> Self {
        let mut tag = vec![String::from("e"), event_id.to_lowercase()];
        if relay.is_some() || marker.is_some() {
            tag.push(relay.unwrap_or("").to_string());
        }
        if let Some(marker) = marker {
            tag.push(marker.to_string());
        }
        self.tag(tag)
    }

    /// `p` tag referencing a pubkey, with optional relay hint and petname.
    pub fn pubkey_ref(self, pubkey: &str, relay: Option<&str>, petname: Option<&str>) -> Self {
        let mut tag = vec![String::from("p"), pubkey.to_lowercase()];
        if relay.is_some() || petname.is_some() {
            tag.push(relay.unwrap_or("").to_string());
        }
        if let Some(petname) = petname {
            tag.push(petname.to_string());
        }
        self.tag(tag)
    }

    /// `a` tag referencing a replaceable-event coordinate.
    pub fn address_ref(self, coordinate: &str, relay: Option<&str>) -> Self {
        let mut tag = vec![String::from("a"), coordinate.to_string()];
        if let Some(relay) = relay {
            tag.push(relay.to_string());
        }
        self.tag(tag)
    }

    /// `t` hashtag.
    pub fn hashtag(self, hashtag: &str) -> Self {
        self.tag(vec![String::from("t"), hashtag.to_string()])
    }

    /// `d` identifier for parameterized replaceable events.
    pub fn identifier(self, identifier: &str) -> Self {
        self.tag(vec![String::from("d"), identifier.to_string()])
    }

    /// `r` reference (relay or URL).
    pub fn reference(self, url: &str) -> Self {
        self.tag(vec![String::from("r"), url.to_string()])
    }

    /// `subject` tag.
    pub fn subject(self, subject: &str) -> Self {
        self.tag(vec![String::from("subject"), subject.to_string()])
    }

    /// `expiration` tag (NIP-40), unix seconds.
    pub fn expiration(self, timestamp: i64) -> Self {
        self.tag(vec![String::from("expiration"), timestamp.to_string()])
    }

    /// `content-warning` tag with optional reason.
    pub fn content_warning(self, reason: Option<&str>) -> Self {
        let mut tag = vec![String::from("content-warning")];
        if let Some(reason) = reason {
            tag.push(reason.to_string());
        }
        self.tag(tag)
    }

    /// Assemble an unsigned event for `author_pubkey`: `id` is
    /// computed, `sig` stays empty. This is the rumor shape NIP-59
    /// consumes, and the input to the proof-of-work miner.
    pub fn build_unsigned(self, author_pubkey: &str) -> Result<Event, Error> {
        let mut event = Event {
            id: String::new(),
            pubkey: author_pubkey.to_lowercase(),
            created_at: self.created_at.unwrap_or_else(unix_now),
            kind: self.kind,
            tags: self.tags,
            content: self.content,
            sig: String::new(),
        };
        event.validate()?;
        event.id = event.compute_id();
        Ok(event)
    }

    /// Assemble and sign in one step.
    pub fn sign(self, keys: &KeyPair) -> Result<Event, Error> {
        let mut event = Event {
            id: String::new(),
            pubkey: keys.public_key_hex().to_string(),
            created_at: self.created_at.unwrap_or_else(unix_now),
            kind: self.kind,
            tags: self.tags,
            content: self.content,
            sig: String::new(),
        };
        keys.sign_event(&mut event)?;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_note_signs_and_verifies() {
        let keys = KeyPair::generate().unwrap();
        let event = EventBuilder::text_note("Hello").sign(&keys).unwrap();
        assert_eq!(event.kind, KIND_TEXT_NOTE);
        assert_eq!(event.content, "Hello");
        event.verify().unwrap();
    }

    #[test]
    fn fixed_timestamp_is_deterministic() {
        let keys = KeyPair::generate().unwrap();
        let a = EventBuilder::text_note("x").created_at(1_700_000_000).sign(&keys).unwrap();
        let b = EventBuilder::text_note("x").created_at(1_700_000_000).sign(&keys).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn tag_conveniences() {
        let keys = KeyPair::generate().unwrap();
        let id = "d94a3f4dd87b9a3b0bed183b32e916fa29c8020107845d1752d72697fe5309a5";
        let pk = "3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d";
        let event = EventBuilder::text_note("reply")
            .event_ref(id, Some("wss://nos.lol"), Some("reply"))
            .pubkey_ref(pk, None, None)
            .hashtag("rust")
            .expiration(1_800_000_000)
            .content_warning(Some("test"))
            .sign(&keys)
            .unwrap();
        assert_eq!(
            event.tags[0],
            vec!["e", id, "wss://nos.lol", "reply"]
        );
        assert_eq!(event.tags[1], vec!["p", pk]);
        assert_eq!(event.tags[2], vec!["t", "rust"]);
        assert_eq!(event.tags[3], vec!["expiration", "1800000000"]);
        assert_eq!(event.tags[4], vec!["content-warning", "test"]);
    }

    #[test]
    fn relay_hint_slot_kept_when_only_marker_given() {
        let keys = KeyPair::generate().unwrap();
        let id = "d94a3f4dd87b9a3b0bed183b32e916fa29c8020107845d1752d72697fe5309a5";
        let event = EventBuilder::text_note("x")
            .event_ref(id, None, Some("root"))
            .sign(&keys)
            .unwrap();
        assert_eq!(event.tags[0], vec!["e", id, "", "root"]);
    }

    #[test]
    fn build_unsigned_has_id_but_no_sig() {
        let keys = KeyPair::generate().unwrap();
        let event = EventBuilder::new(14)
            .content("rumor")
            .build_unsigned(keys.public_key_hex())
            .unwrap();
        assert!(!event.id.is_empty());
        assert!(!event.is_signed());
        assert_eq!(event.id, event.compute_id());
    }
}
