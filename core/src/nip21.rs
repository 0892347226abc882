/*
 * nip21.rs
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

//! `nostr:` URIs (NIP-21) and free-text reference scanning (NIP-27).
//! Accepted prefixes: `nostr:`, `web+nostr:`, `nostr://`. Secret keys
//! decode at the bech32 layer but are refused here; a URI must never
//! carry an nsec.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::Error;
use crate::nip19::{self, Nip19};

const PREFIXES: [&str; 3] = ["nostr://", "web+nostr:", "nostr:"];

/// A reference found in free text, with the byte range it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextReference {
    pub entity: Nip19,
    pub span: Range<usize>,
    pub matched: String,
}

static REFERENCE: OnceLock<Regex> = OnceLock::new();

fn reference_regex() -> &'static Regex {
    REFERENCE.get_or_init(|| {
        Regex::new("nostr:(npub|note|nprofile|nevent|nrelay|naddr)1[qpzry9x8gf2tvdw0s3jn54khce6mua7l]+")
            .unwrap()
    })
}

/// Parse a `nostr:` URI into its entity. Rejects nsec payloads.
pub fn parse_uri(uri: &str) -> Result<Nip19, Error> {
    let trimmed = uri.trim();
    let payload = PREFIXES
        .iter()
        .find_map(|p| trimmed.strip_prefix(p))
        .ok_or_else(|| Error::Validation(String::from("URI must start with nostr: or web+nostr:")))?;
    let entity = nip19::decode(payload)?;
    if matches!(entity, Nip19::SecretKey(_)) {
        return Err(Error::Validation(String::from("secret keys must not appear in URIs")));
    }
    Ok(entity)
}

/// Emit the `nostr:` URI for an entity. Secret keys are refused.
pub fn to_uri(entity: &Nip19) -> Result<String, Error> {
    if matches!(entity, Nip19::SecretKey(_)) {
        return Err(Error::Validation(String::from("secret keys must not appear in URIs")));
    }
    Ok(format!("nostr:{}", entity.to_bech32()?))
}

/// Scan free text for `nostr:` references. Hits that fail to decode
/// (bad checksum, truncated TLV) are skipped.
pub fn scan_text(text: &str) -> Vec<TextReference> {
    reference_regex()
        .find_iter(text)
        .filter_map(|m| {
            let entity = parse_uri(m.as_str()).ok()?;
            Some(TextReference {
                entity,
                span: m.range(),
                matched: m.as_str().to_string(),
            })
        })
        .collect()
}

/// The `p`/`e`/`a` tags an event citing these references must carry
/// (NIP-27). Relay hints fill the second slot when the entity has one.
pub fn reference_tags(references: &[TextReference]) -> Vec<Vec<String>> {
    let mut tags: Vec<Vec<String>> = Vec::new();
    let mut push_unique = |tag: Vec<String>| {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    };
    for reference in references {
        match &reference.entity {
            Nip19::Pubkey(pubkey) => push_unique(vec![String::from("p"), pubkey.clone()]),
            Nip19::Profile(profile) => {
                let mut tag = vec![String::from("p"), profile.pubkey.clone()];
                if let Some(relay) = profile.relays.first() {
                    tag.push(relay.clone());
                }
                push_unique(tag);
            }
            Nip19::EventId(id) => push_unique(vec![String::from("e"), id.clone()]),
            Nip19::Event(pointer) => {
                let mut tag = vec![String::from("e"), pointer.id.clone()];
                if let Some(relay) = pointer.relays.first() {
                    tag.push(relay.clone());
                }
                push_unique(tag);
            }
            Nip19::Address(address) => {
                let mut tag = vec![String::from("a"), address.coordinate()];
                if let Some(relay) = address.relays.first() {
                    tag.push(relay.clone());
                }
                push_unique(tag);
            }
            Nip19::Relay(_) | Nip19::SecretKey(_) => {}
        }
    }
    tags
}

/// Split a URI query string into decoded key/value pairs. Shared by
/// the bunker (NIP-46) and wallet-connect (NIP-47) URI parsers.
pub(crate) fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| match part.find('=') {
            Some(i) => (percent_decode(&part[..i]), percent_decode(&part[i + 1..])),
            None => (percent_decode(part), String::new()),
        })
        .collect()
}

/// %XX decoding for URI components. Malformed sequences pass through
/// unchanged.
pub(crate) fn percent_decode(encoded: &str) -> String {
    percent_encoding::percent_decode_str(encoded)
        .decode_utf8_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nip19::{encode_npub, encode_nsec, encode_note, EventPointer, Profile};

    const PUBKEY: &str = "3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d";
    const NOTE_ID: &str = "d94a3f4dd87b9a3b0bed183b32e916fa29c8020107845d1752d72697fe5309a5";

    #[test]
    fn parse_all_prefixes() {
        let npub = encode_npub(PUBKEY).unwrap();
        for uri in [
            format!("nostr:{}", npub),
            format!("web+nostr:{}", npub),
            format!("nostr://{}", npub),
        ] {
            assert_eq!(parse_uri(&uri).unwrap(), Nip19::Pubkey(PUBKEY.to_string()));
        }
    }

    #[test]
    fn nsec_uri_rejected() {
        let nsec = encode_nsec("67dea2ed018072d675f5415ecfaed7d2597555e202d85b3d65ea4e58d2d92ffa").unwrap();
        assert!(parse_uri(&format!("nostr:{}", nsec)).is_err());
        assert!(to_uri(&Nip19::SecretKey(String::from("aa"))).is_err());
    }

    #[test]
    fn uri_roundtrip() {
        let entity = Nip19::EventId(NOTE_ID.to_string());
        let uri = to_uri(&entity).unwrap();
        assert!(uri.starts_with("nostr:note1"));
        assert_eq!(parse_uri(&uri).unwrap(), entity);
    }

    #[test]
    fn scanner_finds_references_with_spans() {
        let npub = encode_npub(PUBKEY).unwrap();
        let note = encode_note(NOTE_ID).unwrap();
        let text = format!("gm nostr:{} did you see nostr:{}?", npub, note);
        let refs = scan_text(&text);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].entity, Nip19::Pubkey(PUBKEY.to_string()));
        assert_eq!(refs[1].entity, Nip19::EventId(NOTE_ID.to_string()));
        assert_eq!(&text[refs[0].span.clone()], refs[0].matched);
        assert!(refs[1].span.start > refs[0].span.end);
    }

    #[test]
    fn scanner_skips_nsec_and_garbage() {
        let nsec = encode_nsec("67dea2ed018072d675f5415ecfaed7d2597555e202d85b3d65ea4e58d2d92ffa").unwrap();
        let text = format!("leak nostr:{} and nostr:npub1qqqqqqqq end", nsec);
        assert!(scan_text(&text).is_empty());
    }

    #[test]
    fn citation_tags() {
        let profile = Profile::new(PUBKEY, vec![String::from("wss://nos.lol")]).unwrap();
        let mut pointer = EventPointer::new(NOTE_ID, Vec::new()).unwrap();
        pointer.relays = vec![String::from("wss://relay.damus.io")];
        let text = format!(
            "see nostr:{} by nostr:{}",
            pointer.to_bech32().unwrap(),
            profile.to_bech32().unwrap()
        );
        let tags = reference_tags(&scan_text(&text));
        assert_eq!(
            tags,
            vec![
                vec![String::from("e"), NOTE_ID.to_string(), String::from("wss://relay.damus.io")],
                vec![String::from("p"), PUBKEY.to_string(), String::from("wss://nos.lol")],
            ]
        );
    }

    #[test]
    fn duplicate_references_collapse() {
        let note = encode_note(NOTE_ID).unwrap();
        let text = format!("nostr:{} again nostr:{}", note, note);
        let tags = reference_tags(&scan_text(&text));
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn query_helpers() {
        let pairs = parse_query("relay=wss%3A%2F%2Fnos.lol&secret=abc&flag");
        assert_eq!(pairs[0], (String::from("relay"), String::from("wss://nos.lol")));
        assert_eq!(pairs[1], (String::from("secret"), String::from("abc")));
        assert_eq!(pairs[2], (String::from("flag"), String::new()));
        assert_eq!(percent_decode("a%2Fb%zz"), "a/b%zz");
    }
}
