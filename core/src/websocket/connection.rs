/*
 * connection.rs
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

//! WebSocket connection after the handshake. `split()` separates the
//! read side (frame parser, cancellation-safe `next_frame()`) from the
//! write side (masked client frames), so a session can await inbound
//! frames while its other arms send pings and subscriptions.

use std::collections::VecDeque;
use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};

use crate::net::RelayStream;
use crate::websocket::frame::{
    encode_frame, FrameParser, RawFrame, OP_BINARY, OP_CLOSE, OP_PING, OP_PONG, OP_TEXT,
};

/// Decoded frame handed to the session layer.
#[derive(Debug)]
pub enum WsFrame {
    Text(Vec<u8>),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close(Option<u16>, String),
}

pub struct WebSocketConnection {
    stream: RelayStream,
    leftover: BytesMut,
}

impl WebSocketConnection {
    pub(crate) fn new(stream: RelayStream, leftover: BytesMut) -> Self {
        Self { stream, leftover }
    }

    /// Split into independently-owned read and write halves.
    pub fn split(self) -> (WsReader, WsWriter) {
        let (read_half, write_half) = tokio::io::split(self.stream);
        (
            WsReader {
                read_half,
                read_buf: self.leftover,
                parser: FrameParser::new(),
                pending: VecDeque::new(),
            },
            WsWriter { write_half },
        )
    }
}

/// Receive side: buffers stream bytes and yields complete frames.
pub struct WsReader {
    read_half: ReadHalf<RelayStream>,
    read_buf: BytesMut,
    parser: FrameParser,
    pending: VecDeque<RawFrame>,
}

impl WsReader {
    /// Next frame off the wire. `Ok(None)` means the peer closed the
    /// TCP stream. Cancellation-safe: a cancelled call loses no bytes.
    pub async fn next_frame(&mut self) -> io::Result<Option<WsFrame>> {
        loop {
            if !self.read_buf.is_empty() || !self.pending.is_empty() {
                let mut out = Vec::new();
                self.parser.receive(&mut self.read_buf, &mut out)?;
                self.pending.extend(out);
                if let Some(raw) = self.pending.pop_front() {
                    return Ok(Some(decode_frame(raw)));
                }
            }
            let mut tmp = [0u8; 8192];
            let n = self.read_half.read(&mut tmp).await?;
            if n == 0 {
                return Ok(None);
            }
            self.read_buf.extend_from_slice(&tmp[..n]);
        }
    }
}

/// Send side: every frame is masked with a fresh 4-byte key.
pub struct WsWriter {
    write_half: WriteHalf<RelayStream>,
}

impl WsWriter {
    pub async fn send_text(&mut self, data: &[u8]) -> io::Result<()> {
        self.send_frame(OP_TEXT, data).await
    }

    pub async fn send_binary(&mut self, data: &[u8]) -> io::Result<()> {
        self.send_frame(OP_BINARY, data).await
    }

    pub async fn send_ping(&mut self, data: &[u8]) -> io::Result<()> {
        if data.len() > 125 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "ping payload max 125 bytes"));
        }
        self.send_frame(OP_PING, data).await
    }

    pub async fn send_pong(&mut self, data: &[u8]) -> io::Result<()> {
        if data.len() > 125 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "pong payload max 125 bytes"));
        }
        self.send_frame(OP_PONG, data).await
    }

    /// Close frame: optional code in network order, then UTF-8 reason.
    pub async fn send_close(&mut self, code: Option<u16>, reason: &str) -> io::Result<()> {
        let mut payload = Vec::new();
        if let Some(code) = code {
            payload.extend_from_slice(&code.to_be_bytes());
        }
        payload.extend_from_slice(reason.as_bytes());
        if payload.len() > 125 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "close payload max 125 bytes"));
        }
        self.send_frame(OP_CLOSE, &payload).await
    }

    async fn send_frame(&mut self, opcode: u8, payload: &[u8]) -> io::Result<()> {
        let mut mask_key = [0u8; 4];
        getrandom::getrandom(&mut mask_key)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        let mut out = BytesMut::with_capacity(14 + payload.len());
        encode_frame(opcode, payload, &mask_key, &mut out)?;
        self.write_half.write_all(&out).await?;
        self.write_half.flush().await
    }
}

fn decode_frame(raw: RawFrame) -> WsFrame {
    match raw.opcode {
        OP_BINARY => WsFrame::Binary(raw.payload),
        OP_PING => WsFrame::Ping(raw.payload),
        OP_PONG => WsFrame::Pong(raw.payload),
        OP_CLOSE => {
            if raw.payload.len() >= 2 {
                let code = u16::from_be_bytes([raw.payload[0], raw.payload[1]]);
                let reason = String::from_utf8_lossy(&raw.payload[2..]).into_owned();
                WsFrame::Close(Some(code), reason)
            } else {
                WsFrame::Close(None, String::new())
            }
        }
        // Continuation frames are vanishingly rare from relays; treat
        // anything else as text so the JSON decoder reports the issue.
        _ => WsFrame::Text(raw.payload),
    }
}
