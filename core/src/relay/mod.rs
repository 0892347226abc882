/*
 * mod.rs
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

//! Relay runtime: a single-relay session (WebSocket state machine with
//! heartbeat pings, read-timeout watchdog and backoff reconnection)
//! and a pool fanning sends out across sessions while merging their
//! inbound streams.

mod pool;
mod session;

pub use pool::RelayPool;
pub use session::{backoff_delay, RelayOptions, RelaySession, SessionState};
