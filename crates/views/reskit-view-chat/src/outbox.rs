//! Outgoing messages awaiting their server echo
//!
//! An entry is created when the composer is submitted and leaves the outbox
//! when the live channel (or a later history fetch) delivers the stored
//! message. Failed entries stay until the project changes.

use chrono::{DateTime, Duration, Utc};
use reskit_core::{Attachment, Message, MessageId};
use uuid::Uuid;

/// How far a server timestamp may trail the local submit time and still
/// count as the echo of that submit
const ECHO_CLOCK_SLACK_SECS: i64 = 300;

/// Where an outgoing message stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryState {
    /// Request in flight
    Pending,
    /// Server stored it; waiting for the echo
    Accepted {
        /// Id reported by the server, when it reports one
        message_id: Option<MessageId>,
    },
    /// Request rejected or transport failed
    Failed {
        /// Error text
        reason: String,
    },
}

/// One outgoing message
#[derive(Debug, Clone)]
pub struct OutboxEntry {
    /// Client-side id
    pub local_id: Uuid,
    /// Text as typed
    pub text: String,
    /// Attachments flushed with it
    pub attachments: Vec<Attachment>,
    /// Delivery state
    pub state: DeliveryState,
    /// When it was submitted
    pub queued_at: DateTime<Utc>,
}

impl OutboxEntry {
    fn outstanding(&self) -> bool {
        !matches!(self.state, DeliveryState::Failed { .. })
    }
}

/// Ordered outgoing messages
#[derive(Debug, Default)]
pub struct Outbox {
    entries: Vec<OutboxEntry>,
}

impl Outbox {
    /// Empty outbox
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pending entry and return its local id
    pub fn enqueue(&mut self, text: impl Into<String>, attachments: Vec<Attachment>) -> Uuid {
        let local_id = Uuid::new_v4();
        self.entries.push(OutboxEntry {
            local_id,
            text: text.into(),
            attachments,
            state: DeliveryState::Pending,
            queued_at: Utc::now(),
        });
        local_id
    }

    /// Record that the server stored the message
    pub fn accept(&mut self, local_id: Uuid, message_id: Option<MessageId>) -> bool {
        match self.get_mut(local_id) {
            Some(entry) => {
                entry.state = DeliveryState::Accepted { message_id };
                true
            }
            None => false,
        }
    }

    /// Record a failed send
    pub fn fail(&mut self, local_id: Uuid, reason: impl Into<String>) -> bool {
        match self.get_mut(local_id) {
            Some(entry) => {
                entry.state = DeliveryState::Failed {
                    reason: reason.into(),
                };
                true
            }
            None => false,
        }
    }

    /// Drop an entry
    pub fn remove(&mut self, local_id: Uuid) -> Option<OutboxEntry> {
        let idx = self.entries.iter().position(|e| e.local_id == local_id)?;
        Some(self.entries.remove(idx))
    }

    /// Commit the entry `message` echoes, removing it
    ///
    /// A server id match wins; otherwise the oldest outstanding entry with the
    /// same (trimmed) text is taken, provided the message is not older than
    /// the entry. Failed entries are never committed.
    pub fn commit_echo(&mut self, message: &Message) -> Option<OutboxEntry> {
        let by_id = message.id.as_ref().and_then(|id| self.position_of(id));
        let idx = by_id.or_else(|| {
            let text = message.text()?.trim();
            let sent_at = message.timestamp();
            self.entries.iter().position(|e| {
                e.outstanding()
                    && e.text.trim() == text
                    && sent_at.map_or(true, |ts| {
                        ts >= (e.queued_at - Duration::seconds(ECHO_CLOCK_SLACK_SECS)).naive_utc()
                    })
            })
        })?;
        Some(self.entries.remove(idx))
    }

    /// Commit the accepted entry the server stored under `id`
    pub fn commit_id(&mut self, id: &MessageId) -> Option<OutboxEntry> {
        let idx = self.position_of(id)?;
        Some(self.entries.remove(idx))
    }

    fn position_of(&self, id: &MessageId) -> Option<usize> {
        self.entries.iter().position(|e| {
            matches!(&e.state, DeliveryState::Accepted { message_id: Some(m) } if m == id)
        })
    }

    /// Entries in submission order
    pub fn entries(&self) -> &[OutboxEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the outbox is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn get_mut(&mut self, local_id: Uuid) -> Option<&mut OutboxEntry> {
        self.entries.iter_mut().find(|e| e.local_id == local_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reskit_core::{ContentPart, Id, Role, TextBody};

    fn echo(id: Option<&str>, text: &str) -> Message {
        Message {
            id: id.map(|i| Id::Text(i.into())),
            chat_id: None,
            role: Role::User,
            user_id: "u1".into(),
            username: Some("ada".into()),
            content: vec![ContentPart::Text {
                text: TextBody::Plain(text.into()),
            }],
            timestamp: None,
            tool_calls: None,
        }
    }

    #[test]
    fn test_echo_commits_oldest_matching_text() {
        let mut outbox = Outbox::new();
        let first = outbox.enqueue("hello", vec![]);
        let second = outbox.enqueue("hello", vec![]);

        let committed = outbox.commit_echo(&echo(Some("m1"), "hello ")).unwrap();
        assert_eq!(committed.local_id, first);
        assert_eq!(outbox.entries()[0].local_id, second);
    }

    #[test]
    fn test_server_id_match_wins() {
        let mut outbox = Outbox::new();
        let a = outbox.enqueue("same", vec![]);
        let b = outbox.enqueue("same", vec![]);
        outbox.accept(b, Some(Id::Text("m2".into())));

        assert_eq!(outbox.commit_echo(&echo(Some("m2"), "same")).unwrap().local_id, b);
        assert_eq!(outbox.entries()[0].local_id, a);
    }

    #[test]
    fn test_failed_entries_stay() {
        let mut outbox = Outbox::new();
        let id = outbox.enqueue("boom", vec![]);
        assert!(outbox.fail(id, "API error (500): An error occurred"));

        assert!(outbox.commit_echo(&echo(None, "boom")).is_none());
        assert_eq!(outbox.len(), 1);
        assert!(matches!(outbox.entries()[0].state, DeliveryState::Failed { .. }));
    }

    #[test]
    fn test_older_message_is_not_an_echo() {
        let mut outbox = Outbox::new();
        outbox.enqueue("hello", vec![]);
        let mut old = echo(Some("m0"), "hello");
        old.timestamp = Some("2020-01-01T00:00:00.000001".into());

        assert!(outbox.commit_echo(&old).is_none());
        assert_eq!(outbox.len(), 1);

        let id = Id::Text("m5".into());
        let local = outbox.entries()[0].local_id;
        assert!(outbox.commit_id(&id).is_none());
        outbox.accept(local, Some(id.clone()));
        assert_eq!(outbox.commit_id(&id).unwrap().local_id, local);
    }

    #[test]
    fn test_unrelated_echo_is_ignored() {
        let mut outbox = Outbox::new();
        outbox.enqueue("hello", vec![]);
        assert!(outbox.commit_echo(&echo(Some("m9"), "goodbye")).is_none());
        assert!(!outbox.accept(Uuid::new_v4(), None));
    }
}
