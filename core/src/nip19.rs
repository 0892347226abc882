/*
 * nip19.rs
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

//! NIP-19 bech32 entities. `npub`/`nsec`/`note` carry raw 32 bytes;
//! `nprofile`/`nevent`/`naddr`/`nrelay` carry TLV payloads:
//! type 0 special, type 1 relay (repeatable), type 2 author pubkey,
//! type 3 kind (big-endian, leading zeros stripped). Unknown TLV types
//! are skipped on parse.

use bech32::{Bech32, Hrp};

use crate::error::{Bech32Error, Error};
use crate::hex;

pub const HRP_PUBLIC_KEY: &str = "npub";
pub const HRP_SECRET_KEY: &str = "nsec";
pub const HRP_NOTE: &str = "note";
pub const HRP_PROFILE: &str = "nprofile";
pub const HRP_EVENT: &str = "nevent";
pub const HRP_RELAY: &str = "nrelay";
pub const HRP_ADDRESS: &str = "naddr";

const TLV_SPECIAL: u8 = 0;
const TLV_RELAY: u8 = 1;
const TLV_AUTHOR: u8 = 2;
const TLV_KIND: u8 = 3;

/// `nprofile`: pubkey plus relay hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub pubkey: String,
    pub relays: Vec<String>,
}

/// `nevent`: event id plus optional relay hints, author and kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPointer {
    pub id: String,
    pub relays: Vec<String>,
    pub author: Option<String>,
    pub kind: Option<u16>,
}

/// `naddr`: replaceable-event coordinate (kind, pubkey, `d` identifier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressPointer {
    pub identifier: String,
    pub pubkey: String,
    pub kind: u16,
    pub relays: Vec<String>,
}

/// Any NIP-19 entity, routed by HRP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Nip19 {
    Pubkey(String),
    SecretKey(String),
    EventId(String),
    Profile(Profile),
    Event(EventPointer),
    Address(AddressPointer),
    Relay(String),
}

pub fn encode_npub(pubkey_hex: &str) -> Result<String, Error> {
    encode_raw32(HRP_PUBLIC_KEY, pubkey_hex)
}

pub fn encode_nsec(secret_hex: &str) -> Result<String, Error> {
    encode_raw32(HRP_SECRET_KEY, secret_hex)
}

pub fn encode_note(event_id_hex: &str) -> Result<String, Error> {
    encode_raw32(HRP_NOTE, event_id_hex)
}

pub fn npub_to_hex(npub: &str) -> Result<String, Error> {
    decode_raw32(HRP_PUBLIC_KEY, npub)
}

pub fn nsec_to_hex(nsec: &str) -> Result<String, Error> {
    decode_raw32(HRP_SECRET_KEY, nsec)
}

pub fn note_to_hex(note: &str) -> Result<String, Error> {
    decode_raw32(HRP_NOTE, note)
}

/// Decode any bech32 entity, routing on the HRP.
pub fn decode(input: &str) -> Result<Nip19, Error> {
    let (hrp, bytes) = bech32::decode(input.trim())
        .map_err(|e| Error::Bech32(Bech32Error::Decode(e.to_string())))?;
    match hrp.as_str() {
        HRP_PUBLIC_KEY => Ok(Nip19::Pubkey(raw32_to_hex(&bytes)?)),
        HRP_SECRET_KEY => Ok(Nip19::SecretKey(raw32_to_hex(&bytes)?)),
        HRP_NOTE => Ok(Nip19::EventId(raw32_to_hex(&bytes)?)),
        HRP_PROFILE => Ok(Nip19::Profile(Profile::from_tlv(&bytes)?)),
        HRP_EVENT => Ok(Nip19::Event(EventPointer::from_tlv(&bytes)?)),
        HRP_ADDRESS => Ok(Nip19::Address(AddressPointer::from_tlv(&bytes)?)),
        HRP_RELAY => {
            let records = parse_tlv(&bytes)?;
            let url = records
                .iter()
                .find(|(t, _)| *t == TLV_SPECIAL)
                .ok_or(Error::Bech32(Bech32Error::MissingTlv("relay url")))?;
            let url = String::from_utf8(url.1.clone())
                .map_err(|_| Error::Bech32(Bech32Error::Tlv(String::from("relay url is not UTF-8"))))?;
            Ok(Nip19::Relay(url))
        }
        other => Err(Error::Bech32(Bech32Error::UnknownHrp(other.to_string()))),
    }
}

impl Nip19 {
    /// Encode back to bech32 with the entity's HRP.
    pub fn to_bech32(&self) -> Result<String, Error> {
        match self {
            Nip19::Pubkey(hex_key) => encode_npub(hex_key),
            Nip19::SecretKey(hex_key) => encode_nsec(hex_key),
            Nip19::EventId(hex_id) => encode_note(hex_id),
            Nip19::Profile(p) => p.to_bech32(),
            Nip19::Event(e) => e.to_bech32(),
            Nip19::Address(a) => a.to_bech32(),
            Nip19::Relay(url) => {
                let mut payload = Vec::new();
                tlv_push(&mut payload, TLV_SPECIAL, url.as_bytes())?;
                encode_payload(HRP_RELAY, &payload)
            }
        }
    }
}

impl Profile {
    pub fn new(pubkey_hex: &str, relays: Vec<String>) -> Result<Self, Error> {
        if !hex::is_valid_hex_key(pubkey_hex) {
            return Err(Error::Validation(String::from("pubkey must be 64 hex characters")));
        }
        Ok(Self {
            pubkey: pubkey_hex.to_lowercase(),
            relays,
        })
    }

    pub fn to_bech32(&self) -> Result<String, Error> {
        let mut payload = Vec::new();
        tlv_push(&mut payload, TLV_SPECIAL, &hex::decode32(&self.pubkey)?)?;
        for relay in &self.relays {
            tlv_push(&mut payload, TLV_RELAY, relay.as_bytes())?;
        }
        encode_payload(HRP_PROFILE, &payload)
    }

    fn from_tlv(bytes: &[u8]) -> Result<Self, Error> {
        let mut pubkey: Option<String> = None;
        let mut relays = Vec::new();
        for (t, value) in parse_tlv(bytes)? {
            match t {
                TLV_SPECIAL => {
                    if pubkey.is_none() {
                        pubkey = Some(raw32_to_hex(&value)?);
                    }
                }
                TLV_RELAY => relays.push(tlv_string(value)?),
                _ => {}
            }
        }
        Ok(Self {
            pubkey: pubkey.ok_or(Error::Bech32(Bech32Error::MissingTlv("pubkey")))?,
            relays,
        })
    }
}

impl EventPointer {
    pub fn new(event_id_hex: &str, relays: Vec<String>) -> Result<Self, Error> {
        if !hex::is_valid_hex_key(event_id_hex) {
            return Err(Error::Validation(String::from("event id must be 64 hex characters")));
        }
        Ok(Self {
            id: event_id_hex.to_lowercase(),
            relays,
            author: None,
            kind: None,
        })
    }

    pub fn to_bech32(&self) -> Result<String, Error> {
        let mut payload = Vec::new();
        tlv_push(&mut payload, TLV_SPECIAL, &hex::decode32(&self.id)?)?;
        for relay in &self.relays {
            tlv_push(&mut payload, TLV_RELAY, relay.as_bytes())?;
        }
        if let Some(ref author) = self.author {
            tlv_push(&mut payload, TLV_AUTHOR, &hex::decode32(author)?)?;
        }
        if let Some(kind) = self.kind {
            tlv_push(&mut payload, TLV_KIND, &kind_to_be_bytes(kind))?;
        }
        encode_payload(HRP_EVENT, &payload)
    }

    fn from_tlv(bytes: &[u8]) -> Result<Self, Error> {
        let mut id: Option<String> = None;
        let mut relays = Vec::new();
        let mut author: Option<String> = None;
        let mut kind: Option<u16> = None;
        for (t, value) in parse_tlv(bytes)? {
            match t {
                TLV_SPECIAL => {
                    if id.is_none() {
                        id = Some(raw32_to_hex(&value)?);
                    }
                }
                TLV_RELAY => relays.push(tlv_string(value)?),
                TLV_AUTHOR => {
                    if author.is_none() {
                        author = Some(raw32_to_hex(&value)?);
                    }
                }
                TLV_KIND => {
                    if kind.is_none() {
                        kind = Some(kind_from_be_bytes(&value)?);
                    }
                }
                _ => {}
            }
        }
        Ok(Self {
            id: id.ok_or(Error::Bech32(Bech32Error::MissingTlv("event id")))?,
            relays,
            author,
            kind,
        })
    }
}

impl AddressPointer {
    pub fn new(kind: u16, pubkey_hex: &str, identifier: &str, relays: Vec<String>) -> Result<Self, Error> {
        if !hex::is_valid_hex_key(pubkey_hex) {
            return Err(Error::Validation(String::from("pubkey must be 64 hex characters")));
        }
        Ok(Self {
            identifier: identifier.to_string(),
            pubkey: pubkey_hex.to_lowercase(),
            kind,
            relays,
        })
    }

    /// `a`-tag coordinate form `kind:pubkey:identifier`.
    pub fn coordinate(&self) -> String {
        format!("{}:{}:{}", self.kind, self.pubkey, self.identifier)
    }

    pub fn to_bech32(&self) -> Result<String, Error> {
        let mut payload = Vec::new();
        tlv_push(&mut payload, TLV_SPECIAL, self.identifier.as_bytes())?;
        for relay in &self.relays {
            tlv_push(&mut payload, TLV_RELAY, relay.as_bytes())?;
        }
        tlv_push(&mut payload, TLV_AUTHOR, &hex::decode32(&self.pubkey)?)?;
        tlv_push(&mut payload, TLV_KIND, &kind_to_be_bytes(self.kind))?;
        encode_payload(HRP_ADDRESS, &payload)
    }

    fn from_tlv(bytes: &[u8]) -> Result<Self, Error> {
        let mut identifier: Option<String> = None;
        let mut pubkey: Option<String> = None;
        let mut kind: Option<u16> = None;
        let mut relays = Vec::new();
        for (t, value) in parse_tlv(bytes)? {
            match t {
                TLV_SPECIAL => {
                    if identifier.is_none() {
                        identifier = Some(tlv_string(value)?);
                    }
                }
                TLV_RELAY => relays.push(tlv_string(value)?),
                TLV_AUTHOR => {
                    if pubkey.is_none() {
                        pubkey = Some(raw32_to_hex(&value)?);
                    }
                }
                TLV_KIND => {
                    if kind.is_none() {
                        kind = Some(kind_from_be_bytes(&value)?);
                    }
                }
                _ => {}
            }
        }
        Ok(Self {
            identifier: identifier.ok_or(Error::Bech32(Bech32Error::MissingTlv("identifier")))?,
            pubkey: pubkey.ok_or(Error::Bech32(Bech32Error::MissingTlv("author")))?,
            kind: kind.ok_or(Error::Bech32(Bech32Error::MissingTlv("kind")))?,
            relays,
        })
    }
}

fn encode_raw32(hrp: &str, value_hex: &str) -> Result<String, Error> {
    if !hex::is_valid_hex_key(value_hex) {
        return Err(Error::Validation(String::from("value must be 64 hex characters")));
    }
    encode_payload(hrp, &hex::decode32(value_hex)?)
}

fn decode_raw32(expected_hrp: &str, input: &str) -> Result<String, Error> {
    let (hrp, bytes) = bech32::decode(input.trim())
        .map_err(|e| Error::Bech32(Bech32Error::Decode(e.to_string())))?;
    if hrp.as_str() != expected_hrp {
        return Err(Error::Bech32(Bech32Error::UnknownHrp(hrp.as_str().to_string())));
    }
    raw32_to_hex(&bytes)
}

fn raw32_to_hex(bytes: &[u8]) -> Result<String, Error> {
    if bytes.len() != 32 {
        return Err(Error::Bech32(Bech32Error::Length(bytes.len())));
    }
    Ok(hex::encode(bytes))
}

fn encode_payload(hrp: &str, payload: &[u8]) -> Result<String, Error> {
    let hrp = Hrp::parse(hrp).map_err(|e| Error::Bech32(Bech32Error::Decode(e.to_string())))?;
    bech32::encode::<Bech32>(hrp, payload)
        .map_err(|e| Error::Bech32(Bech32Error::Decode(e.to_string())))
}

fn tlv_push(out: &mut Vec<u8>, tlv_type: u8, value: &[u8]) -> Result<(), Error> {
    if value.len() > 255 {
        return Err(Error::Bech32(Bech32Error::Tlv(format!(
            "value too long for TLV: {} bytes",
            value.len()
        ))));
    }
    out.push(tlv_type);
    out.push(value.len() as u8);
    out.extend_from_slice(value);
    Ok(())
}

fn parse_tlv(mut bytes: &[u8]) -> Result<Vec<(u8, Vec<u8>)>, Error> {
    let mut records = Vec::new();
    while !bytes.is_empty() {
        if bytes.len() < 2 {
            return Err(Error::Bech32(Bech32Error::Tlv(String::from("truncated record header"))));
        }
        let t = bytes[0];
        let len = bytes[1] as usize;
        if bytes.len() < 2 + len {
            return Err(Error::Bech32(Bech32Error::Tlv(String::from("truncated record value"))));
        }
        records.push((t, bytes[2..2 + len].to_vec()));
        bytes = &bytes[2 + len..];
    }
    Ok(records)
}

fn tlv_string(value: Vec<u8>) -> Result<String, Error> {
    String::from_utf8(value)
        .map_err(|_| Error::Bech32(Bech32Error::Tlv(String::from("value is not UTF-8"))))
}

/// Kind as big-endian bytes with leading zeros stripped (minimum one byte).
fn kind_to_be_bytes(kind: u16) -> Vec<u8> {
    let bytes = (kind as u32).to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count().min(3);
    bytes[skip..].to_vec()
}

fn kind_from_be_bytes(bytes: &[u8]) -> Result<u16, Error> {
    if bytes.is_empty() || bytes.len() > 4 {
        return Err(Error::Bech32(Bech32Error::Tlv(format!(
            "kind must be 1..4 bytes, got {}",
            bytes.len()
        ))));
    }
    let mut value: u32 = 0;
    for &b in bytes {
        value = (value << 8) | b as u32;
    }
    u16::try_from(value)
        .map_err(|_| Error::Bech32(Bech32Error::Tlv(format!("kind {} out of range", value))))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBKEY: &str = "3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d";
    const SECKEY: &str = "67dea2ed018072d675f5415ecfaed7d2597555e202d85b3d65ea4e58d2d92ffa";
    const NOTE_ID: &str = "d94a3f4dd87b9a3b0bed183b32e916fa29c8020107845d1752d72697fe5309a5";

    #[test]
    fn npub_roundtrip() {
        let npub = encode_npub(PUBKEY).unwrap();
        assert!(npub.starts_with("npub1"));
        assert_eq!(npub_to_hex(&npub).unwrap(), PUBKEY);
        assert_eq!(decode(&npub).unwrap(), Nip19::Pubkey(PUBKEY.to_string()));
    }

    #[test]
    fn nsec_roundtrip() {
        let nsec = encode_nsec(SECKEY).unwrap();
        assert!(nsec.starts_with("nsec1"));
        assert_eq!(nsec_to_hex(&nsec).unwrap(), SECKEY);
    }

    #[test]
    fn note_roundtrip() {
        let note = encode_note(NOTE_ID).unwrap();
        assert!(note.starts_with("note1"));
        assert_eq!(note_to_hex(&note).unwrap(), NOTE_ID);
    }

    #[test]
    fn wrong_hrp_rejected() {
        let npub = encode_npub(PUBKEY).unwrap();
        assert!(nsec_to_hex(&npub).is_err());
    }

    #[test]
    fn corrupted_checksum_rejected() {
        let mut npub = encode_npub(PUBKEY).unwrap();
        let last = npub.pop().unwrap();
        npub.push(if last == 'q' { 'p' } else { 'q' });
        assert!(decode(&npub).is_err());
    }

    #[test]
    fn nprofile_roundtrip() {
        let profile = Profile::new(
            PUBKEY,
            vec![String::from("wss://relay.damus.io"), String::from("wss://nos.lol")],
        )
        .unwrap();
        let encoded = profile.to_bech32().unwrap();
        assert!(encoded.starts_with("nprofile1"));
        match decode(&encoded).unwrap() {
            Nip19::Profile(decoded) => assert_eq!(decoded, profile),
            other => panic!("expected profile, got {:?}", other),
        }
    }

    #[test]
    fn nevent_roundtrip_with_author_and_kind() {
        let mut pointer = EventPointer::new(NOTE_ID, vec![String::from("wss://relay.damus.io")]).unwrap();
        pointer.author = Some(PUBKEY.to_string());
        pointer.kind = Some(30023);
        let encoded = pointer.to_bech32().unwrap();
        match decode(&encoded).unwrap() {
            Nip19::Event(decoded) => assert_eq!(decoded, pointer),
            other => panic!("expected event pointer, got {:?}", other),
        }
    }

    #[test]
    fn naddr_roundtrip() {
        let addr = AddressPointer::new(30023, PUBKEY, "my-post", vec![String::from("wss://nos.lol")]).unwrap();
        let encoded = addr.to_bech32().unwrap();
        match decode(&encoded).unwrap() {
            Nip19::Address(decoded) => assert_eq!(decoded, addr),
            other => panic!("expected address pointer, got {:?}", other),
        }
        assert_eq!(addr.coordinate(), format!("30023:{}:my-post", PUBKEY));
    }

    #[test]
    fn naddr_requires_kind() {
        // special + author but no kind record
        let mut payload = Vec::new();
        tlv_push(&mut payload, TLV_SPECIAL, b"id").unwrap();
        tlv_push(&mut payload, TLV_AUTHOR, &hex::decode32(PUBKEY).unwrap()).unwrap();
        let encoded = encode_payload(HRP_ADDRESS, &payload).unwrap();
        assert!(matches!(
            decode(&encoded),
            Err(Error::Bech32(Bech32Error::MissingTlv("kind")))
        ));
    }

    #[test]
    fn unknown_tlv_types_skipped() {
        let mut payload = Vec::new();
        tlv_push(&mut payload, TLV_SPECIAL, &hex::decode32(PUBKEY).unwrap()).unwrap();
        tlv_push(&mut payload, 200, b"future").unwrap();
        tlv_push(&mut payload, TLV_RELAY, b"wss://nos.lol").unwrap();
        let encoded = encode_payload(HRP_PROFILE, &payload).unwrap();
        match decode(&encoded).unwrap() {
            Nip19::Profile(p) => {
                assert_eq!(p.pubkey, PUBKEY);
                assert_eq!(p.relays, vec!["wss://nos.lol"]);
            }
            other => panic!("expected profile, got {:?}", other),
        }
    }

    #[test]
    fn kind_bytes_strip_leading_zeros() {
        assert_eq!(kind_to_be_bytes(1), vec![1]);
        assert_eq!(kind_to_be_bytes(1059), vec![4, 35]);
        assert_eq!(kind_from_be_bytes(&[4, 35]).unwrap(), 1059);
        assert_eq!(kind_from_be_bytes(&[0, 0, 4, 35]).unwrap(), 1059);
        assert!(kind_from_be_bytes(&[]).is_err());
        assert!(kind_from_be_bytes(&[1, 0, 0]).is_err());
    }

    #[test]
    fn nrelay_roundtrip() {
        let entity = Nip19::Relay(String::from("wss://relay.example.com"));
        let encoded = entity.to_bech32().unwrap();
        assert!(encoded.starts_with("nrelay1"));
        assert_eq!(decode(&encoded).unwrap(), entity);
    }

    #[test]
    fn truncated_tlv_rejected() {
        let encoded = encode_payload(HRP_PROFILE, &[TLV_SPECIAL, 32, 1, 2]).unwrap();
        assert!(matches!(decode(&encoded), Err(Error::Bech32(Bech32Error::Tlv(_)))));
    }
}
