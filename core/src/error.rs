/*
 * error.rs
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

//! Crate-wide error taxonomy. Formatted messages never contain secret
//! material: Display routes through [`redact_secrets`], which strips
//! 64-hex, 128-hex and `nsec1…` substrings.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Errors from any Rondine core operation.
#[derive(Debug)]
pub enum Error {
    /// Malformed hex, wrong-length key/id/sig, oversized content, bad relay URL, malformed tag.
    Validation(String),
    /// JSON shape mismatch on an event, filter, or entity.
    Serialization(String),
    /// Signature/key/ECDH/CSPRNG failure. Never silently substituted.
    Crypto(String),
    /// NIP-44 payload handling.
    Nip44(Nip44Error),
    /// NIP-19 bech32/TLV codec.
    Bech32(Bech32Error),
    /// Transport-level failure.
    Network(NetworkError),
    /// Unknown or malformed wire-message frame.
    Protocol(String),
    /// Proof-of-work search ended without a result.
    Mining(MiningError),
}

/// NIP-44 failures. Each stage rejects with its own variant so callers
/// can distinguish a wrong key (MAC) from a corrupt payload.
#[derive(Debug, PartialEq, Eq)]
pub enum Nip44Error {
    InvalidPayload(String),
    UnsupportedVersion(u8),
    InvalidPadding,
    MacMismatch,
    Encrypt(String),
    Decrypt(String),
}

/// NIP-19 codec failures.
#[derive(Debug, PartialEq, Eq)]
pub enum Bech32Error {
    /// Bad separator, stray character, or checksum failure (from the bech32 crate).
    Decode(String),
    /// HRP is not one of the recognized entity prefixes.
    UnknownHrp(String),
    /// Truncated or overlong TLV record.
    Tlv(String),
    /// A TLV type the entity requires was absent.
    MissingTlv(&'static str),
    /// Payload length wrong for the entity (npub/nsec/note are exactly 32 bytes).
    Length(usize),
}

/// Relay transport failures.
#[derive(Debug)]
pub enum NetworkError {
    Connect(String),
    Send(String),
    NotConnected,
    AlreadyConnected,
    Timeout,
}

/// Proof-of-work miner failures.
#[derive(Debug, PartialEq, Eq)]
pub enum MiningError {
    Cancelled,
    Timeout,
    NonceExhausted,
}

static HEX128: OnceLock<Regex> = OnceLock::new();
static HEX64: OnceLock<Regex> = OnceLock::new();
static NSEC: OnceLock<Regex> = OnceLock::new();

/// Strip secret-shaped substrings from a message: 128-hex signatures
/// first (so they are not split into two 64-hex halves), then 64-hex
/// keys/ids, then bech32 `nsec1…` strings.
pub fn redact_secrets(input: &str) -> String {
    let hex128 = HEX128.get_or_init(|| Regex::new("[0-9a-fA-F]{128}").unwrap());
    let hex64 = HEX64.get_or_init(|| Regex::new("[0-9a-fA-F]{64}").unwrap());
    let nsec = NSEC.get_or_init(|| Regex::new("nsec1[qpzry9x8gf2tvdw0s3jn54khce6mua7l]+").unwrap());
    let out = hex128.replace_all(input, "<redacted>");
    let out = hex64.replace_all(&out, "<redacted>");
    nsec.replace_all(&out, "<redacted>").into_owned()
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(m) => write!(f, "validation: {}", redact_secrets(m)),
            Error::Serialization(m) => write!(f, "serialization: {}", redact_secrets(m)),
            Error::Crypto(m) => write!(f, "crypto: {}", redact_secrets(m)),
            Error::Nip44(e) => write!(f, "nip44: {}", e),
            Error::Bech32(e) => write!(f, "bech32: {}", e),
            Error::Network(e) => write!(f, "network: {}", e),
            Error::Protocol(m) => write!(f, "protocol: {}", redact_secrets(m)),
            Error::Mining(e) => write!(f, "mining: {}", e),
        }
    }
}

impl fmt::Display for Nip44Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nip44Error::InvalidPayload(m) => write!(f, "invalid payload: {}", redact_secrets(m)),
            Nip44Error::UnsupportedVersion(v) => write!(f, "unsupported version {}", v),
            Nip44Error::InvalidPadding => write!(f, "invalid padding"),
            Nip44Error::MacMismatch => write!(f, "MAC verification failed"),
            Nip44Error::Encrypt(m) => write!(f, "encryption failed: {}", redact_secrets(m)),
            Nip44Error::Decrypt(m) => write!(f, "decryption failed: {}", redact_secrets(m)),
        }
    }
}

impl fmt::Display for Bech32Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bech32Error::Decode(m) => write!(f, "decode: {}", redact_secrets(m)),
            Bech32Error::UnknownHrp(hrp) => write!(f, "unknown prefix '{}'", hrp),
            Bech32Error::Tlv(m) => write!(f, "TLV: {}", m),
            Bech32Error::MissingTlv(name) => write!(f, "missing TLV record: {}", name),
            Bech32Error::Length(n) => write!(f, "unexpected payload length {}", n),
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::Connect(m) => write!(f, "connect failed: {}", m),
            NetworkError::Send(m) => write!(f, "send failed: {}", m),
            NetworkError::NotConnected => write!(f, "not connected"),
            NetworkError::AlreadyConnected => write!(f, "already connected"),
            NetworkError::Timeout => write!(f, "timed out"),
        }
    }
}

impl fmt::Display for MiningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiningError::Cancelled => write!(f, "cancelled"),
            MiningError::Timeout => write!(f, "deadline reached"),
            MiningError::NonceExhausted => write!(f, "nonce space exhausted"),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<Nip44Error> for Error {
    fn from(e: Nip44Error) -> Self {
        Error::Nip44(e)
    }
}

impl From<Bech32Error> for Error {
    fn from(e: Bech32Error) -> Self {
        Error::Bech32(e)
    }
}

impl From<NetworkError> for Error {
    fn from(e: NetworkError) -> Self {
        Error::Network(e)
    }
}

impl From<MiningError> for Error {
    fn from(e: MiningError) -> Self {
        Error::Mining(e)
    }
}
