/*
 * metadata.rs
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

//! Profile metadata (kind 0) and relay list metadata (kind 10002,
//! NIP-65). Both are thin shapes over the event model; unknown profile
//! fields are preserved so a re-publish does not destroy what other
//! clients wrote.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::event::{unix_now, Event, KIND_METADATA, KIND_RELAY_LIST};
use crate::filter::Filter;
use crate::keys::KeyPair;

/// Kind-0 content. All fields optional; extras survive round-trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nip05: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lud16: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Build and sign a kind-0 event from a profile.
pub fn build_metadata_event(metadata: &ProfileMetadata, keys: &KeyPair) -> Result<Event, Error> {
    let mut event = Event {
        id: String::new(),
        pubkey: keys.public_key_hex().to_string(),
        created_at: unix_now(),
        kind: KIND_METADATA,
        tags: Vec::new(),
        content: serde_json::to_string(metadata)?,
        sig: String::new(),
    };
    keys.sign_event(&mut event)?;
    Ok(event)
}

/// Parse the profile out of a kind-0 event.
pub fn parse_metadata(event: &Event) -> Result<ProfileMetadata, Error> {
    if event.kind != KIND_METADATA {
        return Err(Error::Validation(format!(
            "expected kind {}, got {}",
            KIND_METADATA, event.kind
        )));
    }
    Ok(serde_json::from_str(&event.content)?)
}

/// Read/write marker on a relay list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMarker {
    Read,
    Write,
}

/// One `r` tag of a kind-10002 event. No marker means read and write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayListEntry {
    pub url: String,
    pub marker: Option<RelayMarker>,
}

/// Build and sign a kind-10002 relay list.
pub fn build_relay_list(entries: &[RelayListEntry], keys: &KeyPair) -> Result<Event, Error> {
    let tags = entries
        .iter()
        .map(|entry| {
            let mut tag = vec![String::from("r"), entry.url.clone()];
            match entry.marker {
                Some(RelayMarker::Read) => tag.push(String::from("read")),
                Some(RelayMarker::Write) => tag.push(String::from("write")),
                None => {}
            }
            tag
        })
        .collect();
    let mut event = Event {
        id: String::new(),
        pubkey: keys.public_key_hex().to_string(),
        created_at: unix_now(),
        kind: KIND_RELAY_LIST,
        tags,
        content: String::new(),
        sig: String::new(),
    };
    keys.sign_event(&mut event)?;
    Ok(event)
}

/// Parse `r` tags from a kind-10002 event. Unknown markers read as
/// no-marker entries.
pub fn parse_relay_list(event: &Event) -> Result<Vec<RelayListEntry>, Error> {
    if event.kind != KIND_RELAY_LIST {
        return Err(Error::Validation(format!(
            "expected kind {}, got {}",
            KIND_RELAY_LIST, event.kind
        )));
    }
    Ok(event
        .tags_named("r")
        .into_iter()
        .filter(|t| t.len() >= 2)
        .map(|t| RelayListEntry {
            url: t[1].clone(),
            marker: match t.get(2).map(String::as_str) {
                Some("read") => Some(RelayMarker::Read),
                Some("write") => Some(RelayMarker::Write),
                _ => None,
            },
        })
        .collect())
}

/// Latest profile of one author.
pub fn metadata_filter(author_pubkey: &str) -> Filter {
    Filter::new().kind(KIND_METADATA).author(author_pubkey).limit(1)
}

/// Latest relay list of one author.
pub fn relay_list_filter(author_pubkey: &str) -> Filter {
    Filter::new().kind(KIND_RELAY_LIST).author(author_pubkey).limit(1)
}
