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

//! Minimal RFC 6455 WebSocket client over tokio + rustls: URL parsing,
//! opening handshake, frame codec, and a connection type exposing
//! `next_frame()` plus masked send methods.

mod client;
mod connection;
mod frame;
mod handshake;

pub use client::{is_valid_relay_url, WebSocketClient};
pub use connection::{WebSocketConnection, WsFrame, WsReader, WsWriter};

pub const CLOSE_NORMAL: u16 = 1000;
