//! What the chat pane shows, in order

use crate::outbox::OutboxEntry;
use reskit_core::Message;

/// One row of the chat pane
#[derive(Debug, Clone, Copy)]
pub enum TimelineEntry<'a> {
    /// A message the server has stored
    Committed {
        /// The message
        message: &'a Message,
        /// Print the author line; false when it repeats the previous author
        show_author: bool,
    },
    /// A message still in the outbox
    Outgoing(&'a OutboxEntry),
}

/// Committed messages followed by outstanding outbox entries
pub fn build<'a>(messages: &'a [Message], outbox: &'a [OutboxEntry]) -> Vec<TimelineEntry<'a>> {
    let mut rows = Vec::with_capacity(messages.len() + outbox.len());
    let mut previous: Option<&Message> = None;
    for message in messages {
        rows.push(TimelineEntry::Committed {
            message,
            show_author: shows_author(previous, message),
        });
        previous = Some(message);
    }
    rows.extend(outbox.iter().map(TimelineEntry::Outgoing));
    rows
}

/// Consecutive messages from the same author share one author line
pub fn shows_author(previous: Option<&Message>, current: &Message) -> bool {
    previous.map_or(true, |p| p.user_id != current.user_id)
}
