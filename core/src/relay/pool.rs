/*
 * pool.rs
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

//! Relay pool: `url → RelaySession`. Sends broadcast concurrently and
//! swallow per-session failures (logged, never raised); inbound
//! messages merge into one `(url, message)` stream. The merge path is
//! one unbounded mpsc producer per session feeding a single consumer,
//! so per-session order is preserved and nothing locks on the hot path.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Error;
use crate::filter::Filter;
use crate::message::{ClientMessage, RelayMessage};
use crate::relay::session::{RelayOptions, RelaySession};

struct PoolEntry {
    session: Arc<RelaySession>,
    forwarder: JoinHandle<()>,
}

pub struct RelayPool {
    options: RelayOptions,
    entries: StdMutex<HashMap<String, PoolEntry>>,
    merged_tx: mpsc::UnboundedSender<(String, RelayMessage)>,
    merged_rx: StdMutex<Option<mpsc::UnboundedReceiver<(String, RelayMessage)>>>,
}

impl RelayPool {
    pub fn new(options: RelayOptions) -> Self {
        let (merged_tx, merged_rx) = mpsc::unbounded_channel();
        Self {
            options,
            entries: StdMutex::new(HashMap::new()),
            merged_tx,
            merged_rx: StdMutex::new(Some(merged_rx)),
        }
    }

    /// Connect a relay and start forwarding its messages into the
    /// merged stream. Adding an already-present URL is a no-op.
    pub async fn add_relay(&self, url: &str) -> Result<(), Error> {
        if self.entries.lock().expect("entries lock").contains_key(url) {
            return Ok(());
        }
        let session = Arc::new(RelaySession::new(url, self.options.clone())?);
        session.connect().await?;
        let mut messages = session
            .messages()
            .expect("fresh session always yields its receiver");

        let merged_tx = self.merged_tx.clone();
        let tag = session.url().to_string();
        let forwarder = tokio::spawn(async move {
            while let Some(message) = messages.recv().await {
                if merged_tx.send((tag.clone(), message)).is_err() {
                    break;
                }
            }
        });

        self.entries.lock().expect("entries lock").insert(
            url.to_string(),
            PoolEntry { session, forwarder },
        );
        Ok(())
    }

    /// Disconnect and drop one relay.
    pub async fn remove_relay(&self, url: &str) {
        let entry = self.entries.lock().expect("entries lock").remove(url);
        if let Some(entry) = entry {
            entry.session.disconnect().await;
            entry.forwarder.abort();
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.entries
            .lock()
            .expect("entries lock")
            .keys()
            .cloned()
            .collect()
    }

    fn sessions(&self) -> Vec<(String, Arc<RelaySession>)> {
        self.entries
            .lock()
            .expect("entries lock")
            .iter()
            .map(|(url, entry)| (url.clone(), Arc::clone(&entry.session)))
            .collect()
    }

    /// Send one frame to every session concurrently. Per-session
    /// failures are logged and swallowed; a dead relay must not stall
    /// the rest.
    pub async fn broadcast(&self, message: &ClientMessage) {
        let mut tasks = Vec::new();
        for (url, session) in self.sessions() {
            let message = message.clone();
            tasks.push(tokio::spawn(async move {
                if let Err(e) = session.send(&message).await {
                    warn!(url = %url, error = %e, "broadcast send failed");
                } else {
                    debug!(url = %url, "broadcast send ok");
                }
            }));
        }
        for task in tasks {
            let _ = task.await;
        }
    }

    /// Broadcast a REQ with these filters.
    pub async fn subscribe(&self, subscription_id: &str, filters: Vec<Filter>) {
        self.broadcast(&ClientMessage::req(subscription_id, filters)).await;
    }

    /// Broadcast the matching CLOSE.
    pub async fn unsubscribe(&self, subscription_id: &str) {
        self.broadcast(&ClientMessage::close(subscription_id)).await;
    }

    /// Merged inbound stream tagged by relay URL. Single-consumer;
    /// per-session order is preserved, sessions interleave arbitrarily.
    pub fn all_messages(&self) -> Option<mpsc::UnboundedReceiver<(String, RelayMessage)>> {
        self.merged_rx.lock().expect("merged lock").take()
    }

    /// Disconnect everything.
    pub async fn shutdown(&self) {
        let urls = self.urls();
        for url in urls {
            self.remove_relay(&url).await;
        }
    }
}
