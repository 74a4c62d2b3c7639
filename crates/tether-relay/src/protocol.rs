//! Relay wire protocol: one JSON object per WebSocket text frame.
//!
//! Only the envelope is interpreted. `data` on forwarded payloads is carried
//! through untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tether_common::{ConnectionId, RelayError, Role, SessionId};

/// Opaque payload kinds and the role each one is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// Host → client (screen frames).
    ScreenData,
    /// Client → host (input events).
    InputData,
}

impl PayloadKind {
    pub fn target(self) -> Role {
        match self {
            PayloadKind::ScreenData => Role::Client,
            PayloadKind::InputData => Role::Host,
        }
    }

    /// Wrap `data` in the outbound envelope for this kind.
    pub fn into_message(self, data: Option<Value>) -> ServerMessage {
        match self {
            PayloadKind::ScreenData => ServerMessage::ScreenData { data },
            PayloadKind::InputData => ServerMessage::InputData { data },
        }
    }
}

/// A parsed inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Attach { role: Role, session_id: SessionId },
    Forward { kind: PayloadKind, data: Option<Value> },
    Ping,
    /// Well-formed object with a `type` we do not handle.
    Unknown(String),
}

#[derive(Deserialize)]
struct AttachFields {
    #[serde(rename = "sessionId")]
    session_id: SessionId,
}

impl Inbound {
    /// Parse a raw frame.
    ///
    /// Anything that is not a JSON object with a string `type`, or a known
    /// type missing its required fields, is `MalformedMessage`. Unknown types
    /// parse successfully so the caller can ignore them.
    pub fn parse(raw: &str) -> Result<Self, RelayError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| RelayError::MalformedMessage(e.to_string()))?;

        let Value::Object(mut fields) = value else {
            return Err(RelayError::MalformedMessage("expected a JSON object".into()));
        };

        let msg_type = match fields.get("type") {
            Some(Value::String(t)) => t.clone(),
            Some(_) => {
                return Err(RelayError::MalformedMessage("`type` must be a string".into()));
            }
            None => return Err(RelayError::MalformedMessage("missing `type`".into())),
        };

        match msg_type.as_str() {
            "host" | "client" => {
                let role = if msg_type == "host" {
                    Role::Host
                } else {
                    Role::Client
                };
                let attach: AttachFields = serde_json::from_value(Value::Object(fields))
                    .map_err(|e| RelayError::MalformedMessage(e.to_string()))?;
                if attach.session_id.is_empty() {
                    return Err(RelayError::MalformedMessage("empty `sessionId`".into()));
                }
                Ok(Inbound::Attach {
                    role,
                    session_id: attach.session_id,
                })
            }
            "screen_data" => Ok(Inbound::Forward {
                kind: PayloadKind::ScreenData,
                data: fields.remove("data"),
            }),
            "input_data" => Ok(Inbound::Forward {
                kind: PayloadKind::InputData,
                data: fields.remove("data"),
            }),
            "ping" => Ok(Inbound::Ping),
            other => Ok(Inbound::Unknown(other.to_string())),
        }
    }
}

/// Messages the relay sends to a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected {
        #[serde(rename = "clientId")]
        client_id: ConnectionId,
        message: String,
    },

    HostReady {
        #[serde(rename = "sessionId")]
        session_id: SessionId,
        message: String,
    },

    ClientReady {
        #[serde(rename = "sessionId")]
        session_id: SessionId,
        message: String,
    },

    /// Sent to a waiting client when the host attaches.
    HostAvailable { message: String },

    /// Sent to a waiting host when the client attaches.
    ClientConnected { message: String },

    HostDisconnected,

    ClientDisconnected,

    ScreenData {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },

    InputData {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },

    Error { message: String },

    Pong,
}

impl ServerMessage {
    pub fn connected(client_id: ConnectionId) -> Self {
        ServerMessage::Connected {
            client_id,
            message: "Connected to relay".into(),
        }
    }

    /// Confirmation to a connection that just claimed `role`.
    pub fn ready(role: Role, session_id: SessionId) -> Self {
        match role {
            Role::Host => ServerMessage::HostReady {
                session_id,
                message: "You are now hosting".into(),
            },
            Role::Client => ServerMessage::ClientReady {
                session_id,
                message: "Connected to session".into(),
            },
        }
    }

    /// Notification to the existing peer that `role` just joined.
    pub fn peer_joined(role: Role) -> Self {
        match role {
            Role::Host => ServerMessage::HostAvailable {
                message: "Host is now available".into(),
            },
            Role::Client => ServerMessage::ClientConnected {
                message: "Client connected to your session".into(),
            },
        }
    }

    /// Notification to the surviving peer that `role` left.
    pub fn peer_left(role: Role) -> Self {
        match role {
            Role::Host => ServerMessage::HostDisconnected,
            Role::Client => ServerMessage::ClientDisconnected,
        }
    }

    pub fn error(err: &RelayError) -> Self {
        ServerMessage::Error {
            message: err.to_string(),
        }
    }

    pub fn session_expired() -> Self {
        ServerMessage::Error {
            message: "Session expired".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_host_attach_normalises_session() {
        let msg = Inbound::parse(r#"{"type":"host","sessionId":"ab12cd"}"#).unwrap();
        assert_eq!(
            msg,
            Inbound::Attach {
                role: Role::Host,
                session_id: SessionId::parse("AB12CD"),
            }
        );
    }

    #[test]
    fn parse_client_attach() {
        let msg = Inbound::parse(r#"{"type":"client","sessionId":"AB12CD"}"#).unwrap();
        assert!(matches!(msg, Inbound::Attach { role: Role::Client, .. }));
    }

    #[test]
    fn attach_without_session_is_malformed() {
        let err = Inbound::parse(r#"{"type":"host"}"#).unwrap_err();
        assert!(matches!(err, RelayError::MalformedMessage(_)));

        let err = Inbound::parse(r#"{"type":"client","sessionId":"  "}"#).unwrap_err();
        assert!(matches!(err, RelayError::MalformedMessage(_)));

        let err = Inbound::parse(r#"{"type":"client","sessionId":42}"#).unwrap_err();
        assert!(matches!(err, RelayError::MalformedMessage(_)));
    }

    #[test]
    fn parse_forward_keeps_data_opaque() {
        let msg = Inbound::parse(
            r#"{"type":"screen_data","sessionId":"AB12CD","data":{"frame":[1,2,3],"q":0.5}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            Inbound::Forward {
                kind: PayloadKind::ScreenData,
                data: Some(json!({"frame":[1,2,3],"q":0.5})),
            }
        );

        let msg = Inbound::parse(r#"{"type":"input_data"}"#).unwrap();
        assert_eq!(
            msg,
            Inbound::Forward {
                kind: PayloadKind::InputData,
                data: None,
            }
        );
    }

    #[test]
    fn parse_ping_and_unknown() {
        assert_eq!(Inbound::parse(r#"{"type":"ping"}"#).unwrap(), Inbound::Ping);
        assert_eq!(
            Inbound::parse(r#"{"type":"file_list"}"#).unwrap(),
            Inbound::Unknown("file_list".into())
        );
    }

    #[test]
    fn non_object_or_untyped_is_malformed() {
        for raw in ["not json", "[1,2]", "\"host\"", r#"{"sessionId":"X"}"#, r#"{"type":5}"#] {
            let err = Inbound::parse(raw).unwrap_err();
            assert!(matches!(err, RelayError::MalformedMessage(_)), "{raw}");
        }
    }

    #[test]
    fn payload_targets() {
        assert_eq!(PayloadKind::ScreenData.target(), Role::Client);
        assert_eq!(PayloadKind::InputData.target(), Role::Host);
    }

    #[test]
    fn forwarded_envelope_matches_input_shape() {
        let msg = PayloadKind::ScreenData.into_message(Some(json!("X")));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"type":"screen_data","data":"X"}));

        let msg = PayloadKind::InputData.into_message(None);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"type":"input_data"}));
    }

    #[test]
    fn control_messages_serialize_with_camel_case_fields() {
        let sid = SessionId::parse("AB12CD");
        let value = serde_json::to_value(ServerMessage::ready(Role::Host, sid.clone())).unwrap();
        assert_eq!(
            value,
            json!({"type":"host_ready","sessionId":"AB12CD","message":"You are now hosting"})
        );

        let value = serde_json::to_value(ServerMessage::ready(Role::Client, sid)).unwrap();
        assert_eq!(value["type"], "client_ready");

        let cid = ConnectionId::new();
        let value = serde_json::to_value(ServerMessage::connected(cid.clone())).unwrap();
        assert_eq!(value["type"], "connected");
        assert_eq!(value["clientId"], cid.as_str());
    }

    #[test]
    fn peer_notifications() {
        let value = serde_json::to_value(ServerMessage::peer_joined(Role::Client)).unwrap();
        assert_eq!(value["type"], "client_connected");
        let value = serde_json::to_value(ServerMessage::peer_joined(Role::Host)).unwrap();
        assert_eq!(value["type"], "host_available");
        assert_eq!(
            serde_json::to_value(ServerMessage::peer_left(Role::Host)).unwrap(),
            json!({"type":"host_disconnected"})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::peer_left(Role::Client)).unwrap(),
            json!({"type":"client_disconnected"})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::Pong).unwrap(),
            json!({"type":"pong"})
        );
    }

    #[test]
    fn error_message_carries_reason() {
        let value =
            serde_json::to_value(ServerMessage::error(&RelayError::SessionNotFound)).unwrap();
        assert_eq!(value, json!({"type":"error","message":"Session not found"}));
    }
}
