//! Chat view for ResKit projects
//!
//! Holds the message timeline of the active project, keeps it in sync with
//! the live channel and the history endpoint, and tracks outgoing messages
//! until the server echoes them back.
//!
//! Network calls never block the caller: [`ChatView`] spawns them and their
//! results come back as [`ChatUpdate`]s on the channel handed to
//! [`ChatView::new`]. The driver feeds them to [`ChatView::apply`].

#![warn(missing_docs)]

pub mod markdown;
pub mod outbox;
pub mod timeline;
pub mod view;

pub use markdown::render_markdown;
pub use outbox::{DeliveryState, Outbox, OutboxEntry};
pub use timeline::TimelineEntry;
pub use view::{ChatUpdate, ChatView, Connection};
