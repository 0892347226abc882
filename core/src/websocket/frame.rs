/*
 * frame.rs
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

//! WebSocket frame format (RFC 6455 §5): push parser for the receive
//! path (server frames must be unmasked), encoder with masking for the
//! send path.

use bytes::{Buf, BufMut, BytesMut};
use std::io;

pub const OP_TEXT: u8 = 1;
pub const OP_BINARY: u8 = 2;
pub const OP_CLOSE: u8 = 8;
pub const OP_PING: u8 = 9;
pub const OP_PONG: u8 = 10;

/// Max data-frame payload. Relay EVENT frames carry up to 256 KiB of
/// content plus JSON envelope and escaping overhead.
pub const MAX_FRAME_PAYLOAD: usize = 1 << 20;

/// One complete frame off the wire.
#[derive(Debug)]
pub struct RawFrame {
    pub opcode: u8,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    Header,
    ExtendedLen2,
    ExtendedLen8,
    Payload,
}

/// Incremental parser: feed bytes, collect completed frames.
pub struct FrameParser {
    state: FrameState,
    opcode: u8,
    payload_len: u64,
}

impl FrameParser {
    pub fn new() -> Self {
        Self {
            state: FrameState::Header,
            opcode: 0,
            payload_len: 0,
        }
    }

    /// Consume whole tokens from `buf`, pushing completed frames into
    /// `out`. Returns when more bytes are needed.
    pub fn receive(&mut self, buf: &mut BytesMut, out: &mut Vec<RawFrame>) -> io::Result<()> {
        loop {
            match self.state {
                FrameState::Header => {
                    if buf.len() < 2 {
                        return Ok(());
                    }
                    let b0 = buf.get_u8();
                    let b1 = buf.get_u8();
                    self.opcode = b0 & 0x0f;
                    if (b1 & 0x80) != 0 {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "server frame must not be masked",
                        ));
                    }
                    let len7 = b1 & 0x7f;
                    if len7 == 126 {
                        self.state = FrameState::ExtendedLen2;
                    } else if len7 == 127 {
                        self.state = FrameState::ExtendedLen8;
                    } else {
                        self.payload_len = len7 as u64;
                        self.state = FrameState::Payload;
                    }
                }
                FrameState::ExtendedLen2 => {
                    if buf.len() < 2 {
                        return Ok(());
                    }
                    self.payload_len = buf.get_u16() as u64;
                    self.state = FrameState::Payload;
                }
                FrameState::ExtendedLen8 => {
                    if buf.len() < 8 {
                        return Ok(());
                    }
                    self.payload_len = buf.get_u64();
                    self.state = FrameState::Payload;
                }
                FrameState::Payload => {
                    let is_control = self.opcode == OP_CLOSE
                        || self.opcode == OP_PING
                        || self.opcode == OP_PONG;
                    if is_control && self.payload_len > 125 {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "control frame payload too long",
                        ));
                    }
                    if !is_control && self.payload_len > MAX_FRAME_PAYLOAD as u64 {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "data frame payload too long",
                        ));
                    }
                    let need = self.payload_len as usize;
                    if buf.len() < need {
                        return Ok(());
                    }
                    let payload = buf.split_to(need).to_vec();
                    out.push(RawFrame {
                        opcode: self.opcode,
                        payload,
                    });
                    self.state = FrameState::Header;
                }
            }
        }
    }
}

/// Encode one client frame. Client frames must be masked; the 4-byte
/// key XORs the payload.
pub fn encode_frame(
    opcode: u8,
    payload: &[u8],
    mask_key: &[u8; 4],
    out: &mut BytesMut,
) -> io::Result<()> {
    let len = payload.len();
    if len > MAX_FRAME_PAYLOAD {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "payload too long"));
    }
    out.put_u8(0x80 | (opcode & 0x0f));
    if len < 126 {
        out.put_u8(0x80 | (len as u8));
    } else if len < 65536 {
        out.put_u8(0x80 | 126);
        out.put_u16(len as u16);
    } else {
        out.put_u8(0x80 | 127);
        out.put_u64(len as u64);
    }
    out.put_slice(mask_key);
    for (i, &b) in payload.iter().enumerate() {
        out.put_u8(b ^ mask_key[i % 4]);
    }
    Ok(())
}
