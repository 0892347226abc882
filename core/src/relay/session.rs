/*
 * session.rs
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

//! Single-relay session. One actor task owns the split WebSocket
//! connection and multiplexes four concerns at its suspension points:
//! commands (send/disconnect), inbound frames, the heartbeat ping, and
//! the read-timeout watchdog. Writes go through the actor, so they are
//! serialized by construction, and `disconnect` cancels everything at
//! once.
//!
//! On failure with `auto_reconnect`, the actor walks
//! Error → Connecting → Connected with backoff
//! `min(60, 2^(attempt-1)) · (1 + U[0,0.2])` seconds; the attempt
//! counter resets only on a clean connect. `messages()` is a single
//! receiver that keeps yielding across reconnects.

use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{Error, NetworkError};
use crate::message::{ClientMessage, RelayMessage};
use crate::websocket::{
    is_valid_relay_url, WebSocketClient, WsFrame, WsReader, WsWriter, CLOSE_NORMAL,
};

/// Connection lifecycle, published on the state stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Session tuning knobs.
#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// WebSocket ping cadence.
    pub ping_interval: Duration,
    /// Idle-read threshold before the watchdog declares the link dead.
    pub read_timeout: Duration,
    /// Reconnect after errors instead of going terminal.
    pub auto_reconnect: bool,
    /// Backoff ceiling.
    pub max_backoff: Duration,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
            auto_reconnect: true,
            max_backoff: Duration::from_secs(60),
        }
    }
}

/// `min(max_backoff, 2^(attempt-1) s)` plus uniform jitter up to 20 %.
pub fn backoff_delay(attempt: u32, max_backoff: Duration) -> Duration {
    let exp = attempt.saturating_sub(1).min(6);
    let capped = Duration::from_secs(1u64 << exp).min(max_backoff);
    capped.mul_f64(1.0 + rand::random::<f64>() * 0.2)
}

enum Command {
    Send(String, oneshot::Sender<Result<(), Error>>),
    Disconnect(oneshot::Sender<()>),
}

pub struct RelaySession {
    url: String,
    options: RelayOptions,
    state_tx: watch::Sender<SessionState>,
    cmd_tx: StdMutex<Option<mpsc::UnboundedSender<Command>>>,
    msg_tx: mpsc::UnboundedSender<RelayMessage>,
    msg_rx: StdMutex<Option<mpsc::UnboundedReceiver<RelayMessage>>>,
}

impl RelaySession {
    /// Validates the URL scheme up front; only `ws://` and `wss://`
    /// are relay URLs.
    pub fn new(url: &str, options: RelayOptions) -> Result<Self, Error> {
        if !is_valid_relay_url(url) {
            return Err(Error::Validation(format!("bad relay URL: {}", url)));
        }
        let (state_tx, _) = watch::channel(SessionState::Disconnected);
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        Ok(Self {
            url: url.trim().to_string(),
            options,
            state_tx,
            cmd_tx: StdMutex::new(None),
            msg_tx,
            msg_rx: StdMutex::new(Some(msg_rx)),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Watch stream of state transitions; observers react without
    /// polling.
    pub fn state_stream(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Inbound message stream. Single-consumer: the receiver can be
    /// taken exactly once, and keeps yielding across reconnects.
    pub fn messages(&self) -> Option<mpsc::UnboundedReceiver<RelayMessage>> {
        self.msg_rx.lock().expect("messages lock").take()
    }

    /// Open the WebSocket. Fails unless the session is `Disconnected`.
    pub async fn connect(&self) -> Result<(), Error> {
        if self.state() != SessionState::Disconnected {
            return Err(Error::Network(NetworkError::AlreadyConnected));
        }
        self.set_state(SessionState::Connecting);
        let connection = match WebSocketClient::connect(&self.url).await {
            Ok(connection) => connection,
            Err(e) => {
                self.set_state(SessionState::Disconnected);
                return Err(Error::Network(NetworkError::Connect(e.to_string())));
            }
        };
        self.set_state(SessionState::Connected);

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        *self.cmd_tx.lock().expect("cmd lock") = Some(cmd_tx);
        let actor = SessionActor {
            url: self.url.clone(),
            options: self.options.clone(),
            state_tx: self.state_tx.clone(),
            msg_tx: self.msg_tx.clone(),
        };
        let (reader, writer) = connection.split();
        tokio::spawn(actor.run(reader, writer, cmd_rx));
        Ok(())
    }

    /// Encode and ship one frame. Requires `Connected`; completion
    /// means the frame was handed to the transport, not that the relay
    /// acknowledged it (that is the matching OK frame).
    pub async fn send(&self, message: &ClientMessage) -> Result<(), Error> {
        if self.state() != SessionState::Connected {
            return Err(Error::Network(NetworkError::NotConnected));
        }
        let text = message.to_json()?;
        let cmd_tx = self
            .cmd_tx
            .lock()
            .expect("cmd lock")
            .clone()
            .ok_or(Error::Network(NetworkError::NotConnected))?;
        let (ack_tx, ack_rx) = oneshot::channel();
        cmd_tx
            .send(Command::Send(text, ack_tx))
            .map_err(|_| Error::Network(NetworkError::NotConnected))?;
        ack_rx
            .await
            .map_err(|_| Error::Network(NetworkError::NotConnected))?
    }

    /// Idempotent: closes the socket with a normal-closure code and
    /// cancels the reader, pinger, watchdog and any pending reconnect.
    pub async fn disconnect(&self) {
        let cmd_tx = self.cmd_tx.lock().expect("cmd lock").take();
        if let Some(cmd_tx) = cmd_tx {
            let (ack_tx, ack_rx) = oneshot::channel();
            if cmd_tx.send(Command::Disconnect(ack_tx)).is_ok() {
                let _ = ack_rx.await;
            }
        }
        self.set_state(SessionState::Disconnected);
    }

    fn set_state(&self, state: SessionState) {
        self.state_tx.send_replace(state);
    }
}

enum DriveEnd {
    /// Clean local close; the session goes terminal.
    Closed(Option<oneshot::Sender<()>>),
    /// Transport failure; reconnect may follow.
    Failed(Error),
}

struct SessionActor {
    url: String,
    options: RelayOptions,
    state_tx: watch::Sender<SessionState>,
    msg_tx: mpsc::UnboundedSender<RelayMessage>,
}

impl SessionActor {
    fn set_state(&self, state: SessionState) {
        self.state_tx.send_replace(state);
    }

    async fn run(
        self,
        mut reader: WsReader,
        mut writer: WsWriter,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    ) {
        let mut attempt: u32 = 0;
        loop {
            match self.drive(&mut reader, &mut writer, &mut cmd_rx).await {
                DriveEnd::Closed(ack) => {
                    self.set_state(SessionState::Disconnected);
                    if let Some(ack) = ack {
                        let _ = ack.send(());
                    }
                    return;
                }
                DriveEnd::Failed(e) => {
                    warn!(url = %self.url, error = %e, "relay connection lost");
                    self.set_state(SessionState::Error);
                    if !self.options.auto_reconnect {
                        return;
                    }
                    match self.reconnect(&mut attempt, &mut cmd_rx).await {
                        Some((next_reader, next_writer)) => {
                            reader = next_reader;
                            writer = next_writer;
                        }
                        None => return,
                    }
                }
            }
        }
    }

    /// One connection's lifetime: commands, frames, ping, watchdog.
    async fn drive(
        &self,
        reader: &mut WsReader,
        writer: &mut WsWriter,
        cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    ) -> DriveEnd {
        let mut ping = tokio::time::interval(self.options.ping_interval);
        let mut watchdog = tokio::time::interval(self.options.read_timeout);
        // the first tick of an interval completes immediately
        ping.tick().await;
        watchdog.tick().await;
        let mut last_receive = Instant::now();

        loop {
            tokio::select! {
                command = cmd_rx.recv() => match command {
                    Some(Command::Send(text, ack)) => {
                        let result = writer
                            .send_text(text.as_bytes())
                            .await
                            .map_err(|e| Error::Network(NetworkError::Send(e.to_string())));
                        let failed = result.is_err();
                        let _ = ack.send(result);
                        if failed {
                            return DriveEnd::Failed(Error::Network(NetworkError::Send(
                                String::from("write failed"),
                            )));
                        }
                    }
                    Some(Command::Disconnect(ack)) => {
                        let _ = writer.send_close(Some(CLOSE_NORMAL), "").await;
                        return DriveEnd::Closed(Some(ack));
                    }
                    // session dropped; shut the connection down
                    None => {
                        let _ = writer.send_close(Some(CLOSE_NORMAL), "").await;
                        return DriveEnd::Closed(None);
                    }
                },

                frame = reader.next_frame() => match frame {
                    Ok(Some(WsFrame::Text(data))) | Ok(Some(WsFrame::Binary(data))) => {
                        last_receive = Instant::now();
                        match std::str::from_utf8(&data) {
                            Ok(text) => match RelayMessage::from_json(text) {
                                Ok(message) => {
                                    // a gone consumer is not an error;
                                    // keep the connection alive
                                    let _ = self.msg_tx.send(message);
                                }
                                Err(e) => {
                                    debug!(url = %self.url, error = %e, "undecodable relay frame");
                                }
                            },
                            Err(_) => {
                                debug!(url = %self.url, "non-UTF-8 relay frame dropped");
                            }
                        }
                    }
                    Ok(Some(WsFrame::Ping(data))) => {
                        last_receive = Instant::now();
                        if let Err(e) = writer.send_pong(&data).await {
                            return DriveEnd::Failed(Error::Network(NetworkError::Send(e.to_string())));
                        }
                    }
                    Ok(Some(WsFrame::Pong(_))) => {
                        last_receive = Instant::now();
                    }
                    Ok(Some(WsFrame::Close(code, _reason))) => {
                        debug!(url = %self.url, code = ?code, "relay closed the connection");
                        return DriveEnd::Failed(Error::Network(NetworkError::Connect(
                            String::from("closed by relay"),
                        )));
                    }
                    Ok(None) => {
                        return DriveEnd::Failed(Error::Network(NetworkError::Connect(
                            String::from("connection reset"),
                        )));
                    }
                    Err(e) => {
                        return DriveEnd::Failed(Error::Network(NetworkError::Connect(e.to_string())));
                    }
                },

                _ = ping.tick() => {
                    if let Err(e) = writer.send_ping(&[]).await {
                        return DriveEnd::Failed(Error::Network(NetworkError::Send(e.to_string())));
                    }
                }

                _ = watchdog.tick() => {
                    if last_receive.elapsed() >= self.options.read_timeout {
                        return DriveEnd::Failed(Error::Network(NetworkError::Timeout));
                    }
                }
            }
        }
    }

    /// Backoff loop. Returns the fresh split connection, or `None`
    /// when a disconnect arrived (or the session was dropped)
    /// mid-backoff.
    async fn reconnect(
        &self,
        attempt: &mut u32,
        cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    ) -> Option<(WsReader, WsWriter)> {
        loop {
            *attempt += 1;
            let delay = backoff_delay(*attempt, self.options.max_backoff);
            debug!(url = %self.url, attempt = *attempt, delay_ms = delay.as_millis() as u64, "scheduling reconnect");
            let deadline = Instant::now() + delay;
            loop {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => break,
                    command = cmd_rx.recv() => match command {
                        Some(Command::Send(_, ack)) => {
                            let _ = ack.send(Err(Error::Network(NetworkError::NotConnected)));
                        }
                        Some(Command::Disconnect(ack)) => {
                            self.set_state(SessionState::Disconnected);
                            let _ = ack.send(());
                            return None;
                        }
                        None => {
                            self.set_state(SessionState::Disconnected);
                            return None;
                        }
                    },
                }
            }

            self.set_state(SessionState::Connecting);
            match WebSocketClient::connect(&self.url).await {
                Ok(connection) => {
                    debug!(url = %self.url, "reconnected");
                    *attempt = 0;
                    self.set_state(SessionState::Connected);
                    return Some(connection.split());
                }
                Err(e) => {
                    warn!(url = %self.url, error = %e, "reconnect attempt failed");
                    self.set_state(SessionState::Error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_ws_urls() {
        assert!(RelaySession::new("https://example.com", RelayOptions::default()).is_err());
        assert!(RelaySession::new("wss://relay.damus.io", RelayOptions::default()).is_ok());
    }

    #[test]
    fn backoff_bounds() {
        let max = Duration::from_secs(60);
        for _ in 0..50 {
            let first = backoff_delay(1, max);
            assert!(first >= Duration::from_secs(1), "{:?}", first);
            assert!(first <= Duration::from_millis(1200), "{:?}", first);

            let second = backoff_delay(2, max);
            assert!(second >= Duration::from_secs(2), "{:?}", second);
            assert!(second <= Duration::from_millis(2400), "{:?}", second);

            // capped at the ceiling (plus jitter)
            let late = backoff_delay(40, max);
            assert!(late >= Duration::from_secs(60), "{:?}", late);
            assert!(late <= Duration::from_millis(72_000), "{:?}", late);
        }
    }

    #[test]
    fn messages_receiver_is_single_consumer() {
        let session = RelaySession::new("wss://relay.damus.io", RelayOptions::default()).unwrap();
        assert!(session.messages().is_some());
        assert!(session.messages().is_none());
    }

    #[tokio::test]
    async fn send_requires_connected() {
        let session = RelaySession::new("wss://relay.damus.io", RelayOptions::default()).unwrap();
        let result = session.send(&ClientMessage::close("sub1")).await;
        assert!(matches!(
            result,
            Err(Error::Network(NetworkError::NotConnected))
        ));
    }

    #[tokio::test]
    async fn disconnect_is_idempotent_when_never_connected() {
        let session = RelaySession::new("wss://relay.damus.io", RelayOptions::default()).unwrap();
        session.disconnect().await;
        session.disconnect().await;
        assert_eq!(session.state(), SessionState::Disconnected);
    }
}
