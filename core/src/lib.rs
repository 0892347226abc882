/*
 * lib.rs
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

//! Rondine core: a client-side library for the Nostr protocol.
//!
//! Events are signed, content-addressed records (NIP-01) exchanged with
//! WebSocket relays. This crate covers the event model and BIP-340
//! Schnorr signing, the NIP-19 bech32/TLV entity codec, `nostr:` URIs
//! (NIP-21/27), NIP-44 v2 encryption, NIP-59 gift wrap, NIP-13
//! proof-of-work, the client/relay wire frames, and a relay runtime
//! (single session with ping/watchdog/reconnect, plus a fan-out pool).
//! Storage, UI, and HTTP discovery (NIP-05) are left to the embedding
//! application.

pub mod error;
pub mod hex;

pub mod builder;
pub mod event;
pub mod filter;
pub mod keys;
pub mod message;
pub mod metadata;

pub mod nip13;
pub mod nip19;
pub mod nip21;
pub mod nip23;
pub mod nip44;
pub mod nip46;
pub mod nip47;
pub mod nip51;
pub mod nip57;
pub mod nip59;
pub mod nip98;

pub mod net;
pub mod relay;
pub mod websocket;

pub use builder::EventBuilder;
pub use error::{Bech32Error, Error, MiningError, NetworkError, Nip44Error};
pub use event::{Event, KIND_CHAT_MESSAGE, KIND_GIFT_WRAP, KIND_METADATA, KIND_RELAY_LIST,
                KIND_SEAL, KIND_TEXT_NOTE};
pub use filter::Filter;
pub use keys::KeyPair;
pub use message::{ClientMessage, RelayMessage};
pub use nip19::{AddressPointer, EventPointer, Nip19, Profile};
pub use relay::{RelayOptions, RelayPool, RelaySession, SessionState};
