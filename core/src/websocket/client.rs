/*
 * client.rs
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

//! WebSocket client entry point: parse a `ws://`/`wss://` relay URL,
//! connect (TLS for wss), run the opening handshake, and hand back a
//! `WebSocketConnection`.

use std::io;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::net::{connect_plain, connect_tls, RelayStream};
use crate::websocket::connection::WebSocketConnection;
use crate::websocket::handshake::{build_handshake_request, parse_handshake_response, verify_accept};

/// Parsed components of a relay URL.
struct WsUrl<'a> {
    secure: bool,
    host: &'a str,
    port: u16,
    path: &'a str,
}

fn parse_ws_url(url: &str) -> io::Result<WsUrl<'_>> {
    let (secure, rest) = if let Some(r) = url.strip_prefix("wss://") {
        (true, r)
    } else if let Some(r) = url.strip_prefix("ws://") {
        (false, r)
    } else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "URL scheme must be ws or wss",
        ));
    };
    let default_port: u16 = if secure { 443 } else { 80 };

    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };

    // IPv6 literals come bracketed: [::1]:7777
    let (host, port) = if let Some(after_bracket) = authority.strip_prefix('[') {
        match after_bracket.find(']') {
            Some(end) => {
                let host = &after_bracket[..end];
                let port = match after_bracket[end + 1..].strip_prefix(':') {
                    Some(p) => p
                        .parse()
                        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid port"))?,
                    None => default_port,
                };
                (host, port)
            }
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "unterminated IPv6 bracket",
                ))
            }
        }
    } else {
        match authority.rfind(':') {
            Some(i) => {
                let port = authority[i + 1..]
                    .parse()
                    .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid port"))?;
                (&authority[..i], port)
            }
            None => (authority, default_port),
        }
    };

    if host.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "URL has no host"));
    }
    Ok(WsUrl {
        secure,
        host,
        port,
        path,
    })
}

/// True when `url` parses as a `ws://` or `wss://` relay URL.
pub fn is_valid_relay_url(url: &str) -> bool {
    parse_ws_url(url.trim()).is_ok()
}

pub struct WebSocketClient;

impl WebSocketClient {
    /// Connect and complete the opening handshake. Any bytes the
    /// server pipelined after the 101 response are kept for the frame
    /// parser.
    pub async fn connect(url: &str) -> io::Result<WebSocketConnection> {
        let parsed = parse_ws_url(url)?;
        let mut stream = if parsed.secure {
            RelayStream::Tls(Box::new(connect_tls(parsed.host, parsed.port).await?))
        } else {
            RelayStream::Plain(connect_plain(parsed.host, parsed.port).await?)
        };

        let mut key_raw = [0u8; 16];
        getrandom::getrandom(&mut key_raw)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        let key_base64 = BASE64.encode(key_raw);

        let request = build_handshake_request(parsed.host, parsed.port, parsed.path, &key_base64);
        stream.write_all(&request).await?;
        stream.flush().await?;

        let mut read_buf = BytesMut::with_capacity(4096);
        loop {
            let mut tmp = [0u8; 4096];
            let n = stream.read(&mut tmp).await?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed during handshake",
                ));
            }
            read_buf.extend_from_slice(&tmp[..n]);
            if let Some((response, consumed)) = parse_handshake_response(&read_buf)? {
                if response.status != 101 {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("expected 101 Switching Protocols, got {}", response.status),
                    ));
                }
                verify_accept(response.accept.as_deref(), &key_base64)?;
                let leftover = read_buf.split_off(consumed);
                return Ok(WebSocketConnection::new(stream, leftover));
            }
        }
    }
}
