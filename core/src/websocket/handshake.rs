/*
 * handshake.rs
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

//! WebSocket opening handshake (RFC 6455 §4): GET with Upgrade
//! headers, single-pass parse of the 101 response, and verification of
//! `Sec-WebSocket-Accept` = base64(SHA-1(key ‖ magic)).

use std::io;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use sha1::{Digest, Sha1};

const WS_ACCEPT_MAGIC: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The GET request opening the handshake. The caller writes this to
/// the stream verbatim.
pub fn build_handshake_request(host: &str, port: u16, path: &str, key_base64: &str) -> Vec<u8> {
    let host_header = if port == 80 || port == 443 {
        host.to_string()
    } else {
        format!("{}:{}", host, port)
    };
    let mut req = Vec::with_capacity(256);
    req.extend_from_slice(b"GET ");
    req.extend_from_slice(path.as_bytes());
    req.extend_from_slice(b" HTTP/1.1\r\nHost: ");
    req.extend_from_slice(host_header.as_bytes());
    req.extend_from_slice(b"\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Key: ");
    req.extend_from_slice(key_base64.as_bytes());
    req.extend_from_slice(b"\r\nSec-WebSocket-Version: 13\r\n\r\n");
    req
}

/// Status line and the one header the client checks.
#[derive(Debug)]
pub struct HandshakeResponse {
    pub status: u16,
    pub accept: Option<String>,
}

/// Parse a buffered 101 response. Returns `None` until the blank line
/// terminating the headers has arrived; on success also returns how
/// many bytes the headers consumed (anything after them is already
/// frame data).
pub fn parse_handshake_response(buf: &[u8]) -> io::Result<Option<(HandshakeResponse, usize)>> {
    let Some(end) = find_headers_end(buf) else {
        return Ok(None);
    };
    let head = std::str::from_utf8(&buf[..end])
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "response headers are not UTF-8"))?;
    let mut lines = head.split("\r\n");
    let status_line = lines
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "empty response"))?;
    let mut parts = status_line.splitn(3, ' ');
    let version = parts.next().unwrap_or("");
    if !version.starts_with("HTTP/1.") {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "not an HTTP response"));
    }
    let status: u16 = parts
        .next()
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "bad status line"))?;

    let mut accept = None;
    for line in lines {
        if line.is_empty() {
            continue;
        }
        if let Some(i) = line.find(':') {
            let name = line[..i].trim();
            if name.eq_ignore_ascii_case("Sec-WebSocket-Accept") {
                accept = Some(line[i + 1..].trim().to_string());
            }
        }
    }
    Ok(Some((HandshakeResponse { status, accept }, end + 4)))
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Expected `Sec-WebSocket-Accept` for the key we sent.
pub fn expected_accept(key_base64: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key_base64.as_bytes());
    hasher.update(WS_ACCEPT_MAGIC);
    BASE64.encode(hasher.finalize())
}

/// Check the server's accept header against our key.
pub fn verify_accept(accept: Option<&str>, key_base64: &str) -> io::Result<()> {
    let expected = expected_accept(key_base64);
    match accept {
        Some(header) if header.trim() == expected => Ok(()),
        Some(_) => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "Sec-WebSocket-Accept mismatch",
        )),
        None => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "missing Sec-WebSocket-Accept",
        )),
    }
}
