//! Chat room events carried by the live channel

use reskit_core::{Message, Paper, ProjectId};
use serde_json::{json, Value};
use tracing::warn;

/// Event delivered to the view driver
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// Namespace connected; rooms must be (re)joined
    Connected,
    /// Connection lost or closed
    Disconnected {
        /// Why
        reason: String,
    },
    /// `new_message`
    NewMessage(Message),
    /// `new_card` (`{"cards": paper}`)
    NewCard(Paper),
    /// Server refused the namespace or the transport failed
    Error(String),
    /// Any other named event
    Other {
        /// Event name
        name: String,
        /// First argument, or null
        payload: Value,
    },
}

impl LiveEvent {
    /// Map a Socket.IO event to chat events
    ///
    /// `new_card` may carry one paper or a list of them, each becoming its own
    /// event. Payloads that do not decode fall back to [`LiveEvent::Other`].
    pub fn from_socket_event(name: &str, args: Vec<Value>) -> Vec<LiveEvent> {
        let payload = args.into_iter().next().unwrap_or(Value::Null);
        match name {
            "new_message" => match serde_json::from_value::<Message>(payload.clone()) {
                Ok(message) => vec![LiveEvent::NewMessage(message)],
                Err(e) => {
                    warn!(error = %e, "Undecodable new_message payload");
                    vec![Self::other(name, payload)]
                }
            },
            "new_card" => {
                let cards = match payload.get("cards") {
                    Some(Value::Array(items)) => items.clone(),
                    Some(single) => vec![single.clone()],
                    None => vec![payload.clone()],
                };
                let papers: Result<Vec<Paper>, _> =
                    cards.into_iter().map(serde_json::from_value).collect();
                match papers {
                    Ok(papers) => papers.into_iter().map(LiveEvent::NewCard).collect(),
                    Err(e) => {
                        warn!(error = %e, "Undecodable new_card payload");
                        vec![Self::other(name, payload)]
                    }
                }
            }
            _ => vec![Self::other(name, payload)],
        }
    }

    fn other(name: &str, payload: Value) -> Self {
        Self::Other {
            name: name.to_string(),
            payload,
        }
    }
}

/// Room membership request sent to the server
#[derive(Debug, Clone, PartialEq)]
pub enum RoomCommand {
    /// `join {projectId}`
    Join(ProjectId),
    /// `leave {projectId}`
    Leave(ProjectId),
}

impl RoomCommand {
    /// Event name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::Leave(_) => "leave",
        }
    }

    /// Event argument
    pub fn payload(&self) -> Value {
        match self {
            Self::Join(id) | Self::Leave(id) => json!({ "projectId": id }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reskit_core::{Id, Role};

    #[test]
    fn test_new_message_decodes() {
        let events = LiveEvent::from_socket_event(
            "new_message",
            vec![json!({
                "id": "m1",
                "role": "assistant",
                "user_id": "system",
                "content": [{"type": "text", "text": "**hi**"}]
            })],
        );
        match &events[..] {
            [LiveEvent::NewMessage(m)] => {
                assert_eq!(m.role, Role::Assistant);
                assert_eq!(m.text(), Some("**hi**"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_new_card_single_and_list() {
        let single = LiveEvent::from_socket_event(
            "new_card",
            vec![json!({"cards": {"title": "Attention", "authors": ["V"]}})],
        );
        assert!(matches!(&single[..], [LiveEvent::NewCard(p)] if p.title == "Attention"));

        let many = LiveEvent::from_socket_event(
            "new_card",
            vec![json!({"cards": [{"title": "A"}, {"title": "B"}]})],
        );
        assert_eq!(many.len(), 2);
    }

    #[test]
    fn test_bad_payload_falls_back_to_other() {
        let events = LiveEvent::from_socket_event("new_message", vec![json!(7)]);
        assert!(matches!(&events[..], [LiveEvent::Other { name, .. }] if name == "new_message"));
    }

    #[test]
    fn test_room_payload_keeps_id_shape() {
        assert_eq!(
            RoomCommand::Join(Id::Numeric(42)).payload(),
            json!({"projectId": 42})
        );
        assert_eq!(
            RoomCommand::Leave(Id::Text("a-b".into())).payload(),
            json!({"projectId": "a-b"})
        );
    }
}
