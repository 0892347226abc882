/*
 * nip51.rs
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

//! NIP-51 lists. Public items are plain tags on the event; private
//! items are the same tag shapes, JSON-encoded and NIP-44-encrypted to
//! the author's own key in `content`. Standard lists (mute 10000, pin
//! 10001) are replaceable; sets (30000, 30003) carry a `d` identifier.

use crate::error::Error;
use crate::event::{unix_now, Event, KIND_BOOKMARK_SET, KIND_FOLLOW_SET, KIND_MUTE_LIST, KIND_PIN_LIST};
use crate::keys::KeyPair;
use crate::nip44;

/// One list entry, mirroring its tag shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListItem {
    /// `["p", pubkey, relay?, petname?]`
    Pubkey {
        pubkey: String,
        relay: Option<String>,
        petname: Option<String>,
    },
    /// `["e", id, relay?]`
    Event { id: String, relay: Option<String> },
    /// `["a", kind:pubkey:d, relay?]`
    Address {
        coordinate: String,
        relay: Option<String>,
    },
    /// `["t", hashtag]`
    Hashtag(String),
    /// `["r", url]`
    Relay(String),
    /// `["word", word]` (mute lists)
    Word(String),
}

impl ListItem {
    pub fn to_tag(&self) -> Vec<String> {
        match self {
            ListItem::Pubkey {
                pubkey,
                relay,
                petname,
            } => {
                let mut tag = vec![String::from("p"), pubkey.clone()];
                if relay.is_some() || petname.is_some() {
                    tag.push(relay.clone().unwrap_or_default());
                }
                if let Some(petname) = petname {
                    tag.push(petname.clone());
                }
                tag
            }
            ListItem::Event { id, relay } => {
                let mut tag = vec![String::from("e"), id.clone()];
                if let Some(relay) = relay {
                    tag.push(relay.clone());
                }
                tag
            }
            ListItem::Address { coordinate, relay } => {
                let mut tag = vec![String::from("a"), coordinate.clone()];
                if let Some(relay) = relay {
                    tag.push(relay.clone());
                }
                tag
            }
            ListItem::Hashtag(hashtag) => vec![String::from("t"), hashtag.clone()],
            ListItem::Relay(url) => vec![String::from("r"), url.clone()],
            ListItem::Word(word) => vec![String::from("word"), word.clone()],
        }
    }

    pub fn from_tag(tag: &[String]) -> Option<Self> {
        let name = tag.first()?;
        let value = tag.get(1)?;
        let optional = |i: usize| tag.get(i).filter(|s| !s.is_empty()).cloned();
        match name.as_str() {
            "p" => Some(ListItem::Pubkey {
                pubkey: value.clone(),
                relay: optional(2),
                petname: optional(3),
            }),
            "e" => Some(ListItem::Event {
                id: value.clone(),
                relay: optional(2),
            }),
            "a" => Some(ListItem::Address {
                coordinate: value.clone(),
                relay: optional(2),
            }),
            "t" => Some(ListItem::Hashtag(value.clone())),
            "r" => Some(ListItem::Relay(value.clone())),
            "word" => Some(ListItem::Word(value.clone())),
            _ => None,
        }
    }
}

fn is_set_kind(kind: u16) -> bool {
    kind == KIND_FOLLOW_SET || kind == KIND_BOOKMARK_SET
}

fn is_list_kind(kind: u16) -> bool {
    kind == KIND_MUTE_LIST || kind == KIND_PIN_LIST || is_set_kind(kind)
}

/// Build and sign a list event. Sets require an identifier; standard
/// lists refuse one. Private items are encrypted to the author.
pub fn build_list(
    kind: u16,
    identifier: Option<&str>,
    public_items: &[ListItem],
    private_items: &[ListItem],
    keys: &KeyPair,
) -> Result<Event, Error> {
    if !is_list_kind(kind) {
        return Err(Error::Validation(format!("kind {} is not a supported list kind", kind)));
    }
    if is_set_kind(kind) && identifier.is_none() {
        return Err(Error::Validation(String::from("list sets require a d identifier")));
    }
    if !is_set_kind(kind) && identifier.is_some() {
        return Err(Error::Validation(String::from("standard lists take no d identifier")));
    }
    let mut tags = Vec::new();
    if let Some(identifier) = identifier {
        tags.push(vec![String::from("d"), identifier.to_string()]);
    }
    tags.extend(public_items.iter().map(ListItem::to_tag));

    let content = if private_items.is_empty() {
        String::new()
    } else {
        let private_tags: Vec<Vec<String>> = private_items.iter().map(ListItem::to_tag).collect();
        let json = serde_json::to_string(&private_tags)?;
        let key = nip44::conversation_key(keys, keys.public_key_hex())?;
        nip44::encrypt(&json, &key)?
    };

    let mut event = Event {
        id: String::new(),
        pubkey: keys.public_key_hex().to_string(),
        created_at: unix_now(),
        kind,
        tags,
        content,
        sig: String::new(),
    };
    keys.sign_event(&mut event)?;
    Ok(event)
}

/// Public items of a list event, skipping structural tags like `d`.
pub fn public_items(event: &Event) -> Vec<ListItem> {
    event
        .tags
        .iter()
        .filter(|t| t.first().map(String::as_str) != Some("d"))
        .filter_map(|t| ListItem::from_tag(t))
        .collect()
}

/// Decrypt and parse the private items. Empty content means an empty
/// private section, not an error.
pub fn private_items(event: &Event, keys: &KeyPair) -> Result<Vec<ListItem>, Error> {
    if event.content.is_empty() {
        return Ok(Vec::new());
    }
    let key = nip44::conversation_key(keys, keys.public_key_hex())?;
    let json = nip44::decrypt(&event.content, &key)?;
    let tags: Vec<Vec<String>> = serde_json::from_str(&json)?;
    Ok(tags.iter().filter_map(|t| ListItem::from_tag(t)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBKEY: &str = "3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d";

    #[test]
    fn mute_list_with_private_items() {
        let keys = KeyPair::generate().unwrap();
        let public = vec![ListItem::Word(String::from("spam"))];
        let private = vec![
            ListItem::Pubkey {
                pubkey: PUBKEY.to_string(),
                relay: None,
                petname: None,
            },
            ListItem::Hashtag(String::from("ads")),
        ];
        let event = build_list(KIND_MUTE_LIST, None, &public, &private, &keys).unwrap();
        assert_eq!(event.kind, KIND_MUTE_LIST);
        event.verify().unwrap();

        assert_eq!(public_items(&event), public);
        // private items are unreadable in the clear
        assert!(!event.content.contains(PUBKEY));
        assert_eq!(private_items(&event, &keys).unwrap(), private);
    }

    #[test]
    fn follow_set_requires_identifier() {
        let keys = KeyPair::generate().unwrap();
        assert!(build_list(KIND_FOLLOW_SET, None, &[], &[], &keys).is_err());
        let event = build_list(KIND_FOLLOW_SET, Some("friends"), &[], &[], &keys).unwrap();
        assert_eq!(event.identifier(), Some("friends"));
    }

    #[test]
    fn standard_list_refuses_identifier() {
        let keys = KeyPair::generate().unwrap();
        assert!(build_list(KIND_PIN_LIST, Some("x"), &[], &[], &keys).is_err());
    }

    #[test]
    fn unsupported_kind_rejected() {
        let keys = KeyPair::generate().unwrap();
        assert!(build_list(1, None, &[], &[], &keys).is_err());
    }

    #[test]
    fn tag_roundtrip_with_petname() {
        let item = ListItem::Pubkey {
            pubkey: PUBKEY.to_string(),
            relay: Some(String::from("wss://nos.lol")),
            petname: Some(String::from("fiatjaf")),
        };
        let tag = item.to_tag();
        assert_eq!(tag, vec!["p", PUBKEY, "wss://nos.lol", "fiatjaf"]);
        assert_eq!(ListItem::from_tag(&tag).unwrap(), item);
    }

    #[test]
    fn other_keys_cannot_read_private_items() {
        let keys = KeyPair::generate().unwrap();
        let other = KeyPair::generate().unwrap();
        let private = vec![ListItem::Hashtag(String::from("secret"))];
        let event = build_list(KIND_MUTE_LIST, None, &[], &private, &keys).unwrap();
        assert!(private_items(&event, &other).is_err());
    }
}
