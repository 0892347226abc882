/*
 * filter.rs
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

//! Subscription filter (NIP-01). Every specified field must match
//! (AND); within a list-valued field any element suffices (OR). Tag
//! indices use `#e`/`#p` JSON names; unknown `#x` fields survive a
//! decode/encode round-trip via the flattened map.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::event::Event;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<u16>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(rename = "#e", skip_serializing_if = "Option::is_none")]
    pub event_refs: Option<Vec<String>>,
    #[serde(rename = "#p", skip_serializing_if = "Option::is_none")]
    pub pubkey_refs: Option<Vec<String>>,
    /// Any other field, notably `#<single-letter>` tag indices.
    /// Preserved verbatim on round-trip.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(self, id: &str) -> Self {
        self.ids([id])
    }

    pub fn ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids
            .get_or_insert_with(Vec::new)
            .extend(ids.into_iter().map(|s| s.into().to_lowercase()));
        self
    }

    pub fn author(self, author: &str) -> Self {
        self.authors([author])
    }

    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors
            .get_or_insert_with(Vec::new)
            .extend(authors.into_iter().map(|s| s.into().to_lowercase()));
        self
    }

    pub fn kind(self, kind: u16) -> Self {
        self.kinds([kind])
    }

    pub fn kinds<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        self.kinds.get_or_insert_with(Vec::new).extend(kinds);
        self
    }

    pub fn since(mut self, since: i64) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: i64) -> Self {
        self.until = Some(until);
        self
    }

    /// Wall-clock variant of [`since`](Self::since); whole seconds,
    /// truncated toward zero.
    pub fn since_time(self, time: DateTime<Utc>) -> Self {
        self.since(time.timestamp())
    }

    /// Wall-clock variant of [`until`](Self::until).
    pub fn until_time(self, time: DateTime<Utc>) -> Self {
        self.until(time.timestamp())
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn event_ref(mut self, event_id: &str) -> Self {
        self.event_refs
            .get_or_insert_with(Vec::new)
            .push(event_id.to_lowercase());
        self
    }

    pub fn pubkey_ref(mut self, pubkey: &str) -> Self {
        self.pubkey_refs
            .get_or_insert_with(Vec::new)
            .push(pubkey.to_lowercase());
        self
    }

    /// Generic `#<letter>` tag index.
    pub fn tag_filter<I, S>(mut self, letter: char, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let key = format!("#{}", letter);
        let list: Vec<Value> = values.into_iter().map(|v| Value::String(v.into())).collect();
        match self.extra.entry(key).or_insert_with(|| Value::Array(Vec::new())) {
            Value::Array(existing) => existing.extend(list),
            other => *other = Value::Array(list),
        }
        self
    }

    /// Does `event` satisfy every specified field?
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ref ids) = self.ids {
            if !ids.iter().any(|id| id.eq_ignore_ascii_case(&event.id)) {
                return false;
            }
        }
        if let Some(ref authors) = self.authors {
            if !authors.iter().any(|a| a.eq_ignore_ascii_case(&event.pubkey)) {
                return false;
            }
        }
        if let Some(ref kinds) = self.kinds {
            if !kinds.contains(&event.kind) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if event.created_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if event.created_at > until {
                return false;
            }
        }
        if let Some(ref refs) = self.event_refs {
            if !tag_index_matches(event, "e", refs.iter().map(|s| s.as_str())) {
                return false;
            }
        }
        if let Some(ref refs) = self.pubkey_refs {
            if !tag_index_matches(event, "p", refs.iter().map(|s| s.as_str())) {
                return false;
            }
        }
        for (key, value) in &self.extra {
            let Some(letter) = tag_index_name(key) else { continue };
            let Value::Array(values) = value else { continue };
            let wanted = values.iter().filter_map(|v| v.as_str());
            if !tag_index_matches(event, letter, wanted) {
                return false;
            }
        }
        true
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

/// `#x` keys with a single-letter index name.
fn tag_index_name(key: &str) -> Option<&str> {
    let name = key.strip_prefix('#')?;
    (name.chars().count() == 1).then_some(name)
}

fn tag_index_matches<'a>(
    event: &Event,
    tag_name: &str,
    wanted: impl Iterator<Item = &'a str>,
) -> bool {
    let mut wanted = wanted.peekable();
    if wanted.peek().is_none() {
        return true;
    }
    wanted.any(|value| {
        event
            .tags
            .iter()
            .any(|t| t.len() >= 2 && t[0] == tag_name && t[1].eq_ignore_ascii_case(value))
    })
}
