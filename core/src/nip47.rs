/*
 * nip47.rs
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

//! NIP-47 wallet connect URI:
//! `nostr+walletconnect://<wallet-pubkey>?relay=…&secret=<64-hex>[&lud16=…]`.
//! The secret is the client's throwaway key for the wallet session, so
//! the parsed struct redacts it from Debug output.

use std::fmt;

use crate::error::Error;
use crate::hex;
use crate::nip21::parse_query;

#[derive(Clone, PartialEq, Eq)]
pub struct WalletConnectUri {
    pub wallet_pubkey: String,
    pub relays: Vec<String>,
    pub secret: String,
    pub lud16: Option<String>,
}

impl WalletConnectUri {
    pub fn parse(uri: &str) -> Result<Self, Error> {
        let rest = uri
            .trim()
            .strip_prefix("nostr+walletconnect://")
            .ok_or_else(|| {
                Error::Validation(String::from("URI must start with nostr+walletconnect://"))
            })?;
        let (pubkey, query) = match rest.find('?') {
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => (rest, ""),
        };
        if !hex::is_valid_hex_key(pubkey) {
            return Err(Error::Validation(String::from(
                "wallet pubkey must be 64 hex characters",
            )));
        }
        let mut relays = Vec::new();
        let mut secret = None;
        let mut lud16 = None;
        for (key, value) in parse_query(query) {
            match key.as_str() {
                "relay" if !value.is_empty() => relays.push(value),
                "secret" => secret = Some(value),
                "lud16" if !value.is_empty() => lud16 = Some(value),
                _ => {}
            }
        }
        if relays.is_empty() {
            return Err(Error::Validation(String::from(
                "wallet connect URI requires at least one relay",
            )));
        }
        let secret = secret.ok_or_else(|| {
            Error::Validation(String::from("wallet connect URI requires a secret"))
        })?;
        if !hex::is_valid_hex_key(&secret) {
            return Err(Error::Validation(String::from(
                "wallet connect secret must be 64 hex characters",
            )));
        }
        Ok(Self {
            wallet_pubkey: pubkey.to_lowercase(),
            relays,
            secret: secret.to_lowercase(),
            lud16,
        })
    }
}

impl fmt::Display for WalletConnectUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nostr+walletconnect://{}", self.wallet_pubkey)?;
        for (i, relay) in self.relays.iter().enumerate() {
            write!(f, "{}relay={}", if i == 0 { '?' } else { '&' }, relay)?;
        }
        write!(f, "&secret={}", self.secret)?;
        if let Some(ref lud16) = self.lud16 {
            write!(f, "&lud16={}", lud16)?;
        }
        Ok(())
    }
}

impl fmt::Debug for WalletConnectUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletConnectUri")
            .field("wallet_pubkey", &self.wallet_pubkey)
            .field("relays", &self.relays)
            .field("secret", &"<redacted>")
            .field("lud16", &self.lud16)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d";
    const SECRET: &str = "67dea2ed018072d675f5415ecfaed7d2597555e202d85b3d65ea4e58d2d92ffa";

    #[test]
    fn roundtrip() {
        let uri = WalletConnectUri {
            wallet_pubkey: WALLET.to_string(),
            relays: vec![String::from("wss://relay.getalby.com/v1")],
            secret: SECRET.to_string(),
            lud16: Some(String::from("user@getalby.com")),
        };
        assert_eq!(WalletConnectUri::parse(&uri.to_string()).unwrap(), uri);
    }

    #[test]
    fn requires_relay_and_secret() {
        assert!(WalletConnectUri::parse(&format!(
            "nostr+walletconnect://{}?secret={}",
            WALLET, SECRET
        ))
        .is_err());
        assert!(WalletConnectUri::parse(&format!(
            "nostr+walletconnect://{}?relay=wss://r.example.com",
            WALLET
        ))
        .is_err());
        assert!(WalletConnectUri::parse(&format!(
            "nostr+walletconnect://{}?relay=wss://r.example.com&secret=tooshort",
            WALLET
        ))
        .is_err());
    }

    #[test]
    fn debug_redacts_secret() {
        let uri = WalletConnectUri {
            wallet_pubkey: WALLET.to_string(),
            relays: vec![String::from("wss://r.example.com")],
            secret: SECRET.to_string(),
            lud16: None,
        };
        assert!(!format!("{:?}", uri).contains(SECRET));
    }
}
