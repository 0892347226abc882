/*
 * nip23.rs
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

//! NIP-23 long-form articles: kind 30023 (published) / 30024 (draft),
//! parameterized by the `d` identifier. Content is markdown; title,
//! summary, image, first-publication timestamp and hashtags ride as tags.

use crate::error::Error;
use crate::event::{Event, KIND_ARTICLE, KIND_ARTICLE_DRAFT};
use crate::keys::KeyPair;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Article {
    /// `d` tag; stable across edits of the same article.
    pub identifier: String,
    /// Markdown body.
    pub content: String,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub image: Option<String>,
    /// Unix seconds of first publication, carried across edits.
    pub published_at: Option<i64>,
    pub hashtags: Vec<String>,
}

/// Build and sign an article event. `draft` selects kind 30024.
pub fn build_article(article: &Article, keys: &KeyPair, draft: bool) -> Result<Event, Error> {
    if article.identifier.is_empty() {
        return Err(Error::Validation(String::from("article requires a d identifier")));
    }
    let mut tags = vec![vec![String::from("d"), article.identifier.clone()]];
    if let Some(ref title) = article.title {
        tags.push(vec![String::from("title"), title.clone()]);
    }
    if let Some(ref summary) = article.summary {
        tags.push(vec![String::from("summary"), summary.clone()]);
    }
    if let Some(ref image) = article.image {
        tags.push(vec![String::from("image"), image.clone()]);
    }
    if let Some(published_at) = article.published_at {
        tags.push(vec![String::from("published_at"), published_at.to_string()]);
    }
    for hashtag in &article.hashtags {
        tags.push(vec![String::from("t"), hashtag.clone()]);
    }
    let mut event = Event {
        id: String::new(),
        pubkey: keys.public_key_hex().to_string(),
        created_at: crate::event::unix_now(),
        kind: if draft { KIND_ARTICLE_DRAFT } else { KIND_ARTICLE },
        tags,
        content: article.content.clone(),
        sig: String::new(),
    };
    keys.sign_event(&mut event)?;
    Ok(event)
}

/// Read an article back out of a kind-30023/30024 event.
pub fn parse_article(event: &Event) -> Result<Article, Error> {
    if event.kind != KIND_ARTICLE && event.kind != KIND_ARTICLE_DRAFT {
        return Err(Error::Validation(format!(
            "expected kind {} or {}, got {}",
            KIND_ARTICLE, KIND_ARTICLE_DRAFT, event.kind
        )));
    }
    let identifier = event
        .identifier()
        .ok_or_else(|| Error::Validation(String::from("article missing d tag")))?;
    Ok(Article {
        identifier: identifier.to_string(),
        content: event.content.clone(),
        title: event.tag_value("title").map(str::to_string),
        summary: event.tag_value("summary").map(str::to_string),
        image: event.tag_value("image").map(str::to_string),
        published_at: event.tag_value("published_at").and_then(|v| v.parse().ok()),
        hashtags: event.tag_values("t").iter().map(|s| s.to_string()).collect(),
    })
}
