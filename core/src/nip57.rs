/*
 * nip57.rs
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

//! NIP-57 zaps. A zap request (kind 9734) is handed to a LNURL server,
//! which pays out and publishes a zap receipt (kind 9735) carrying the
//! invoice and the request JSON in its `description` tag.

use crate::error::Error;
use crate::event::{Event, KIND_ZAP_RECEIPT, KIND_ZAP_REQUEST};
use crate::hex;
use crate::keys::KeyPair;

/// Parameters for a zap request.
#[derive(Debug, Clone, Default)]
pub struct ZapRequest {
    /// Recipient pubkey (64 hex).
    pub recipient: String,
    /// Relays the receipt should be published to.
    pub relays: Vec<String>,
    /// Amount in millisats, echoed into the `amount` tag.
    pub amount_msat: Option<u64>,
    /// The LNURL pay endpoint, bech32-encoded, for the `lnurl` tag.
    pub lnurl: Option<String>,
    /// Event being zapped, if any.
    pub event_id: Option<String>,
    /// Optional comment shown to the recipient.
    pub message: String,
}

/// Build and sign a kind-9734 zap request.
pub fn build_zap_request(request: &ZapRequest, keys: &KeyPair) -> Result<Event, Error> {
    if !hex::is_valid_hex_key(&request.recipient) {
        return Err(Error::Validation(String::from("recipient must be 64 hex characters")));
    }
    if request.relays.is_empty() {
        return Err(Error::Validation(String::from("zap request requires at least one relay")));
    }
    let mut relays_tag = vec![String::from("relays")];
    relays_tag.extend(request.relays.iter().cloned());
    let mut tags = vec![relays_tag, vec![String::from("p"), request.recipient.to_lowercase()]];
    if let Some(amount) = request.amount_msat {
        tags.push(vec![String::from("amount"), amount.to_string()]);
    }
    if let Some(ref lnurl) = request.lnurl {
        tags.push(vec![String::from("lnurl"), lnurl.clone()]);
    }
    if let Some(ref event_id) = request.event_id {
        if !hex::is_valid_hex_key(event_id) {
            return Err(Error::Validation(String::from("event id must be 64 hex characters")));
        }
        tags.push(vec![String::from("e"), event_id.to_lowercase()]);
    }
    let mut event = Event {
        id: String::new(),
        pubkey: keys.public_key_hex().to_string(),
        created_at: crate::event::unix_now(),
        kind: KIND_ZAP_REQUEST,
        tags,
        content: request.message.clone(),
        sig: String::new(),
    };
    keys.sign_event(&mut event)?;
    Ok(event)
}

/// Parsed view of a kind-9735 zap receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZapReceipt {
    pub recipient: String,
    pub bolt11: String,
    /// The zap request JSON, verbatim.
    pub description: String,
    pub preimage: Option<String>,
    pub event_id: Option<String>,
    /// Sender pubkey from the `P` tag, when the LNURL server includes it.
    pub sender: Option<String>,
}

/// Extract the receipt fields. `bolt11` and `description` are required
/// by the NIP; anything else is optional.
pub fn parse_zap_receipt(event: &Event) -> Result<ZapReceipt, Error> {
    if event.kind != KIND_ZAP_RECEIPT {
        return Err(Error::Validation(format!(
            "expected kind {}, got {}",
            KIND_ZAP_RECEIPT, event.kind
        )));
    }
    let recipient = event
        .tag_value("p")
        .ok_or_else(|| Error::Validation(String::from("zap receipt missing p tag")))?;
    let bolt11 = event
        .tag_value("bolt11")
        .ok_or_else(|| Error::Validation(String::from("zap receipt missing bolt11 tag")))?;
    let description = event
        .tag_value("description")
        .ok_or_else(|| Error::Validation(String::from("zap receipt missing description tag")))?;
    Ok(ZapReceipt {
        recipient: recipient.to_string(),
        bolt11: bolt11.to_string(),
        description: description.to_string(),
        preimage: event.tag_value("preimage").map(str::to_string),
        event_id: event.tag_value("e").map(str::to_string),
        sender: event.tag_value("P").map(str::to_string),
    })
}
