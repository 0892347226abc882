/*
 * message.rs
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

//! Wire frames (NIP-01). Every message is a top-level JSON array whose
//! first element is the discriminant. Client→relay: EVENT, REQ, CLOSE.
//! Relay→client: EVENT, OK, EOSE, CLOSED, NOTICE, AUTH. Decoders check
//! positional types and report the expected shape on mismatch.

use serde_json::{json, Value};

use crate::error::Error;
use crate::event::Event;
use crate::filter::Filter;

/// Client→relay frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// `["EVENT", <event>]`
    Event(Event),
    /// `["REQ", <subId>, <filter>…]`
    Req {
        subscription_id: String,
        filters: Vec<Filter>,
    },
    /// `["CLOSE", <subId>]`
    Close { subscription_id: String },
}

/// Relay→client frame.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayMessage {
    /// `["EVENT", <subId>, <event>]`
    Event {
        subscription_id: String,
        event: Event,
    },
    /// `["OK", <eventId>, <bool>, <message?>]`
    Ok {
        event_id: String,
        accepted: bool,
        message: Option<String>,
    },
    /// `["EOSE", <subId>]`
    Eose { subscription_id: String },
    /// `["CLOSED", <subId>, <message?>]`
    Closed {
        subscription_id: String,
        message: Option<String>,
    },
    /// `["NOTICE", <message>]`
    Notice { message: String },
    /// `["AUTH", <challenge>]`
    Auth { challenge: String },
}

impl ClientMessage {
    pub fn req(subscription_id: impl Into<String>, filters: Vec<Filter>) -> Self {
        ClientMessage::Req {
            subscription_id: subscription_id.into(),
            filters,
        }
    }

    pub fn close(subscription_id: impl Into<String>) -> Self {
        ClientMessage::Close {
            subscription_id: subscription_id.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, Error> {
        let value = match self {
            ClientMessage::Event(event) => json!(["EVENT", event]),
            ClientMessage::Req {
                subscription_id,
                filters,
            } => {
                let mut array = vec![json!("REQ"), json!(subscription_id)];
                for filter in filters {
                    array.push(serde_json::to_value(filter)?);
                }
                Value::Array(array)
            }
            ClientMessage::Close { subscription_id } => json!(["CLOSE", subscription_id]),
        };
        Ok(serde_json::to_string(&value)?)
    }

    /// Decode a client frame. Used by tests and relay-side tooling.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let (tag, rest) = split_frame(json)?;
        match tag.as_str() {
            "EVENT" => {
                let event = object_at(&rest, 0, "[\"EVENT\", <event>]")?;
                Ok(ClientMessage::Event(serde_json::from_value(event)?))
            }
            "REQ" => {
                if rest.is_empty() {
                    return Err(shape_error("[\"REQ\", <subId>, <filter>...]"));
                }
                let subscription_id = string_at(&rest, 0, "[\"REQ\", <subId>, <filter>...]")?;
                let mut filters = Vec::new();
                for value in &rest[1..] {
                    if !value.is_object() {
                        return Err(shape_error("[\"REQ\", <subId>, <filter>...]"));
                    }
                    filters.push(serde_json::from_value(value.clone())?);
                }
                Ok(ClientMessage::Req {
                    subscription_id,
                    filters,
                })
            }
            "CLOSE" => Ok(ClientMessage::Close {
                subscription_id: string_at(&rest, 0, "[\"CLOSE\", <subId>]")?,
            }),
            other => Err(Error::Protocol(format!(
                "unknown client message discriminant \"{}\"",
                other
            ))),
        }
    }
}

impl RelayMessage {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let (tag, rest) = split_frame(json)?;
        match tag.as_str() {
            "EVENT" => {
                let shape = "[\"EVENT\", <subId>, <event>]";
                let subscription_id = string_at(&rest, 0, shape)?;
                let event = object_at(&rest, 1, shape)?;
                Ok(RelayMessage::Event {
                    subscription_id,
                    event: serde_json::from_value(event)?,
                })
            }
            "OK" => {
                let shape = "[\"OK\", <eventId>, <bool>, <message?>]";
                let event_id = string_at(&rest, 0, shape)?;
                let accepted = match rest.get(1) {
                    Some(Value::Bool(b)) => *b,
                    _ => return Err(shape_error(shape)),
                };
                let message = match rest.get(2) {
                    None => None,
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(_) => return Err(shape_error(shape)),
                };
                Ok(RelayMessage::Ok {
                    event_id,
                    accepted,
                    message,
                })
            }
            "EOSE" => Ok(RelayMessage::Eose {
                subscription_id: string_at(&rest, 0, "[\"EOSE\", <subId>]")?,
            }),
            "CLOSED" => {
                let shape = "[\"CLOSED\", <subId>, <message?>]";
                let subscription_id = string_at(&rest, 0, shape)?;
                let message = match rest.get(1) {
                    None => None,
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(_) => return Err(shape_error(shape)),
                };
                Ok(RelayMessage::Closed {
                    subscription_id,
                    message,
                })
            }
            "NOTICE" => Ok(RelayMessage::Notice {
                message: string_at(&rest, 0, "[\"NOTICE\", <message>]")?,
            }),
            "AUTH" => Ok(RelayMessage::Auth {
                challenge: string_at(&rest, 0, "[\"AUTH\", <challenge>]")?,
            }),
            other => Err(Error::Protocol(format!(
                "unknown relay message discriminant \"{}\"",
                other
            ))),
        }
    }

    /// Encode a relay frame. Used by tests and relay-side tooling.
    pub fn to_json(&self) -> Result<String, Error> {
        let value = match self {
            RelayMessage::Event {
                subscription_id,
                event,
            } => json!(["EVENT", subscription_id, event]),
            RelayMessage::Ok {
                event_id,
                accepted,
                message,
            } => match message {
                Some(message) => json!(["OK", event_id, accepted, message]),
                None => json!(["OK", event_id, accepted]),
            },
            RelayMessage::Eose { subscription_id } => json!(["EOSE", subscription_id]),
            RelayMessage::Closed {
                subscription_id,
                message,
            } => match message {
                Some(message) => json!(["CLOSED", subscription_id, message]),
                None => json!(["CLOSED", subscription_id]),
            },
            RelayMessage::Notice { message } => json!(["NOTICE", message]),
            RelayMessage::Auth { challenge } => json!(["AUTH", challenge]),
        };
        Ok(serde_json::to_string(&value)?)
    }
}

fn split_frame(json: &str) -> Result<(String, Vec<Value>), Error> {
    let value: Value = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(e) => return Err(Error::Protocol(format!("frame is not valid JSON: {}", e))),
    };
    let Value::Array(mut array) = value else {
        return Err(Error::Protocol(String::from("frame must be a JSON array")));
    };
    if array.is_empty() {
        return Err(Error::Protocol(String::from("frame must not be empty")));
    }
    let Value::String(tag) = array.remove(0) else {
        return Err(Error::Protocol(String::from(
            "frame must start with a string discriminant",
        )));
    };
    Ok((tag, array))
}

fn string_at(rest: &[Value], index: usize, shape: &str) -> Result<String, Error> {
    match rest.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(shape_error(shape)),
    }
}

fn object_at(rest: &[Value], index: usize, shape: &str) -> Result<Value, Error> {
    match rest.get(index) {
        Some(v @ Value::Object(_)) => Ok(v.clone()),
        _ => Err(shape_error(shape)),
    }
}

fn shape_error(shape: &str) -> Error {
    Error::Protocol(format!("expected {}", shape))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::EventBuilder;
    use crate::keys::KeyPair;

    fn signed_event() -> Event {
        let keys = KeyPair::generate().unwrap();
        EventBuilder::text_note("Hello").sign(&keys).unwrap()
    }

    #[test]
    fn event_frame_roundtrip() {
        let event = signed_event();
        let json = ClientMessage::Event(event.clone()).to_json().unwrap();
        assert!(json.starts_with("[\"EVENT\",{"));
        match ClientMessage::from_json(&json).unwrap() {
            ClientMessage::Event(back) => assert_eq!(back, event),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn req_frame_carries_all_filters() {
        let msg = ClientMessage::req(
            "sub1",
            vec![Filter::new().kind(1), Filter::new().kind(7).limit(5)],
        );
        let json = msg.to_json().unwrap();
        assert!(json.starts_with("[\"REQ\",\"sub1\",{"));
        assert_eq!(ClientMessage::from_json(&json).unwrap(), msg);
    }

    #[test]
    fn no_forward_slash_escaping_on_encode() {
        let mut event = signed_event();
        event.content = String::from("https://example.com/x");
        let json = ClientMessage::Event(event).to_json().unwrap();
        assert!(json.contains("https://example.com/x"));
        assert!(!json.contains("\\/"));
    }

    #[test]
    fn ok_with_and_without_message() {
        let id = "d94a3f4dd87b9a3b0bed183b32e916fa29c8020107845d1752d72697fe5309a5";
        let short = format!("[\"OK\",\"{}\",true]", id);
        match RelayMessage::from_json(&short).unwrap() {
            RelayMessage::Ok {
                event_id,
                accepted,
                message,
            } => {
                assert_eq!(event_id, id);
                assert!(accepted);
                assert_eq!(message, None);
            }
            other => panic!("unexpected {:?}", other),
        }

        let long = format!("[\"OK\",\"{}\",false,\"invalid: bad sig\"]", id);
        match RelayMessage::from_json(&long).unwrap() {
            RelayMessage::Ok {
                accepted, message, ..
            } => {
                assert!(!accepted);
                assert_eq!(message.as_deref(), Some("invalid: bad sig"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn relay_event_frame_roundtrip() {
        let event = signed_event();
        let msg = RelayMessage::Event {
            subscription_id: String::from("sub1"),
            event,
        };
        let json = msg.to_json().unwrap();
        assert_eq!(RelayMessage::from_json(&json).unwrap(), msg);
    }

    #[test]
    fn closed_notice_auth_eose() {
        match RelayMessage::from_json("[\"CLOSED\",\"sub1\",\"auth-required: do auth\"]").unwrap() {
            RelayMessage::Closed {
                subscription_id,
                message,
            } => {
                assert_eq!(subscription_id, "sub1");
                assert_eq!(message.as_deref(), Some("auth-required: do auth"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            RelayMessage::from_json("[\"EOSE\",\"sub1\"]").unwrap(),
            RelayMessage::Eose {
                subscription_id: String::from("sub1")
            }
        );
        assert_eq!(
            RelayMessage::from_json("[\"NOTICE\",\"slow down\"]").unwrap(),
            RelayMessage::Notice {
                message: String::from("slow down")
            }
        );
        assert_eq!(
            RelayMessage::from_json("[\"AUTH\",\"challenge-string\"]").unwrap(),
            RelayMessage::Auth {
                challenge: String::from("challenge-string")
            }
        );
    }

    #[test]
    fn unknown_discriminant_is_protocol_error() {
        assert!(matches!(
            RelayMessage::from_json("[\"COUNT\",\"sub1\",{}]"),
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            RelayMessage::from_json("{\"not\":\"array\"}"),
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            RelayMessage::from_json("[42]"),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn positional_type_mismatch_is_protocol_error() {
        assert!(matches!(
            RelayMessage::from_json("[\"OK\",\"id\",\"yes\"]"),
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            RelayMessage::from_json("[\"EVENT\",42,{}]"),
            Err(Error::Protocol(_))
        ));
    }
}
