//! Chat view state machine
//!
//! The view is owned by the driver task and mutated only there. Network work
//! runs on spawned tasks that report back as [`ChatUpdate`]s; every update
//! carries the epoch it was issued under and is dropped when the project has
//! changed since.

use crate::markdown;
use crate::outbox::{DeliveryState, Outbox};
use crate::timeline::{self, TimelineEntry};
use chrono::NaiveDateTime;
use reskit_core::{
    Attachment, AttachmentKind, FileUpload, Message, MessageId, ProjectId, ResearchApi,
    ReskitError, Result, SendMessageRequest, SendReceipt, UploadReceipt, User,
};
use reskit_provider_live::{LiveChannel, LiveEvent};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Result of a spawned request, delivered back to the view
#[derive(Debug)]
pub enum ChatUpdate {
    /// Full history for the project
    History {
        /// Epoch the fetch was issued under
        epoch: u64,
        /// Fetched messages
        result: Result<Vec<Message>>,
    },
    /// Messages newer than the last one seen, after a reconnect
    CatchUp {
        /// Epoch the fetch was issued under
        epoch: u64,
        /// Fetched messages
        result: Result<Vec<Message>>,
    },
    /// `send-message` finished
    SendSettled {
        /// Epoch the send was issued under
        epoch: u64,
        /// Outbox entry
        local_id: Uuid,
        /// Server reply
        result: Result<SendReceipt>,
    },
    /// One attachment upload finished
    Uploaded {
        /// Epoch the upload was issued under
        epoch: u64,
        /// Local file name
        name: String,
        /// File kind
        kind: AttachmentKind,
        /// Server reply
        result: Result<UploadReceipt>,
    },
}

/// Live channel state as seen by the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    /// No namespace connection
    Disconnected,
    /// Rooms can be joined
    Connected,
}

/// Messages of one project plus the composer
pub struct ChatView {
    api: Arc<dyn ResearchApi>,
    live: Arc<dyn LiveChannel>,
    me: Option<User>,
    updates: mpsc::UnboundedSender<ChatUpdate>,

    project: Option<ProjectId>,
    epoch: u64,
    connection: Connection,
    joined: Option<ProjectId>,
    ever_connected: bool,
    history_loaded: bool,

    messages: Vec<Message>,
    seen: HashSet<MessageId>,
    last_seen: Option<NaiveDateTime>,
    outbox: Outbox,

    composer: String,
    attachments: Vec<Attachment>,
    uploads_in_flight: usize,
}

impl ChatView {
    /// Create a view with no active project
    pub fn new(
        api: Arc<dyn ResearchApi>,
        live: Arc<dyn LiveChannel>,
        me: Option<User>,
        updates: mpsc::UnboundedSender<ChatUpdate>,
    ) -> Self {
        Self {
            api,
            live,
            me,
            updates,
            project: None,
            epoch: 0,
            connection: Connection::Disconnected,
            joined: None,
            ever_connected: false,
            history_loaded: false,
            messages: Vec::new(),
            seen: HashSet::new(),
            last_seen: None,
            outbox: Outbox::new(),
            composer: String::new(),
            attachments: Vec::new(),
            uploads_in_flight: 0,
        }
    }

    /// Active project
    pub fn project(&self) -> Option<&ProjectId> {
        self.project.as_ref()
    }

    /// Bumped on every project switch
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Live channel state
    pub fn connection(&self) -> Connection {
        self.connection
    }

    /// Whether history for the active project has arrived
    pub fn history_loaded(&self) -> bool {
        self.history_loaded
    }

    /// Committed messages in display order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Outgoing messages
    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Rows to display
    pub fn timeline(&self) -> Vec<TimelineEntry<'_>> {
        timeline::build(&self.messages, self.outbox.entries())
    }

    /// Composer text
    pub fn composer(&self) -> &str {
        &self.composer
    }

    /// Replace the composer text
    pub fn set_composer(&mut self, text: impl Into<String>) {
        self.composer = text.into();
    }

    /// Uploaded attachments waiting for the next send
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Uploads not yet finished
    pub fn uploads_in_flight(&self) -> usize {
        self.uploads_in_flight
    }

    /// Switch to another project (or none)
    ///
    /// Clears the visible messages, moves room membership and fetches the new
    /// history. Selecting the active project again does nothing.
    pub fn set_project(&mut self, project: Option<ProjectId>) {
        if project == self.project {
            return;
        }
        self.epoch += 1;
        info!(project = ?project, epoch = self.epoch, "Switching chat project");

        self.messages.clear();
        self.seen.clear();
        self.last_seen = None;
        self.outbox.clear();
        self.attachments.clear();
        self.uploads_in_flight = 0;
        self.history_loaded = false;

        self.leave_room();
        self.project = project;
        self.join_room();
        self.fetch_history();
    }

    /// React to a live channel event
    pub fn handle_live_event(&mut self, event: LiveEvent) {
        match event {
            LiveEvent::Connected => {
                let reconnect = self.ever_connected;
                self.connection = Connection::Connected;
                self.ever_connected = true;
                self.join_room();
                if reconnect {
                    self.catch_up();
                }
            }
            LiveEvent::Disconnected { reason } => {
                info!(%reason, "Live channel disconnected");
                self.connection = Connection::Disconnected;
                self.joined = None;
            }
            LiveEvent::NewMessage(message) => self.receive(message, true),
            LiveEvent::NewCard(paper) => self.receive(Message::card(paper), false),
            LiveEvent::Error(reason) => warn!(%reason, "Live channel error"),
            LiveEvent::Other { name, .. } => debug!(event = %name, "Ignoring live event"),
        }
    }

    /// Submit the composer
    ///
    /// The composer is cleared at once and pending attachments are flushed
    /// into the request. Returns the outbox id, or `None` when the text is
    /// blank or no project is active.
    pub fn send(&mut self) -> Option<Uuid> {
        if self.composer.trim().is_empty() {
            return None;
        }
        let project = match &self.project {
            Some(project) => project.clone(),
            None => {
                warn!("No active project; message not sent");
                return None;
            }
        };

        let text = std::mem::take(&mut self.composer);
        let attachments = std::mem::take(&mut self.attachments);
        let request = SendMessageRequest {
            project_id: project,
            message: text.clone(),
            attachments: attachments.iter().map(|a| a.file_id.clone()).collect(),
        };
        let local_id = self.outbox.enqueue(text, attachments);

        let api = self.api.clone();
        let updates = self.updates.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let result = api.send_message(request).await;
            let _ = updates.send(ChatUpdate::SendSettled {
                epoch,
                local_id,
                result,
            });
        });
        Some(local_id)
    }

    /// Upload files for the next send
    ///
    /// Only pdf, image and text files are accepted; the rest are returned.
    pub fn attach(&mut self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let project = match &self.project {
            Some(project) => project.clone(),
            None => {
                warn!("No active project; attachments ignored");
                return paths.to_vec();
            }
        };

        let mut rejected = Vec::new();
        for path in paths {
            let kind = match AttachmentKind::from_path(path) {
                Some(kind) => kind,
                None => {
                    warn!(path = %path.display(), "Unsupported attachment type");
                    rejected.push(path.clone());
                    continue;
                }
            };
            self.uploads_in_flight += 1;

            let api = self.api.clone();
            let updates = self.updates.clone();
            let epoch = self.epoch;
            let project = project.clone();
            let path = path.clone();
            tokio::spawn(async move {
                let name = file_name(&path);
                let result = match read_upload(&path, &name).await {
                    Ok(upload) => api.upload(&project, upload).await,
                    Err(e) => Err(e),
                };
                let _ = updates.send(ChatUpdate::Uploaded {
                    epoch,
                    name,
                    kind,
                    result,
                });
            });
        }
        rejected
    }

    /// Drop an attachment before sending; client side only
    pub fn remove_attachment(&mut self, file_id: &str) -> bool {
        let before = self.attachments.len();
        self.attachments.retain(|a| a.file_id != file_id);
        before != self.attachments.len()
    }

    /// Apply a finished request
    pub fn apply(&mut self, update: ChatUpdate) {
        let epoch = match &update {
            ChatUpdate::History { epoch, .. }
            | ChatUpdate::CatchUp { epoch, .. }
            | ChatUpdate::SendSettled { epoch, .. }
            | ChatUpdate::Uploaded { epoch, .. } => *epoch,
        };
        if epoch != self.epoch {
            debug!(epoch, current = self.epoch, "Discarding stale chat update");
            return;
        }

        match update {
            ChatUpdate::History { result, .. } => match result {
                Ok(history) => self.merge_history(history),
                Err(e) => error!(error = %e, "Failed to load messages"),
            },
            ChatUpdate::CatchUp { result, .. } => match result {
                Ok(newer) => {
                    debug!(count = newer.len(), "Catch-up messages");
                    for message in newer {
                        self.receive(message, true);
                    }
                }
                Err(e) => warn!(error = %e, "Catch-up failed"),
            },
            ChatUpdate::SendSettled {
                local_id, result, ..
            } => match result {
                Ok(receipt) => {
                    let echoed = receipt
                        .message_id
                        .as_ref()
                        .map_or(false, |id| self.seen.contains(id));
                    if echoed {
                        self.outbox.remove(local_id);
                    } else {
                        self.outbox.accept(local_id, receipt.message_id);
                    }
                }
                Err(e) => {
                    error!(error = %e, "Error sending message");
                    self.outbox.fail(local_id, e.to_string());
                }
            },
            ChatUpdate::Uploaded {
                name, kind, result, ..
            } => {
                self.uploads_in_flight = self.uploads_in_flight.saturating_sub(1);
                match result {
                    Ok(receipt) => {
                        info!(file = %name, id = %receipt.filename, "Attachment uploaded");
                        self.attachments.push(Attachment {
                            file_id: receipt.filename,
                            name,
                            kind,
                        });
                    }
                    Err(e) => error!(file = %name, error = %e, "Error uploading file"),
                }
            }
        }
    }

    /// Leave the room and close the live channel
    pub fn unmount(&mut self) {
        self.leave_room();
        if let Err(e) = self.live.close() {
            debug!(error = %e, "Live channel already closed");
        }
        self.connection = Connection::Disconnected;
    }

    /// Failed sends, for display
    pub fn failed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outbox.entries().iter().filter_map(|e| match &e.state {
            DeliveryState::Failed { reason } => Some((e.text.as_str(), reason.as_str())),
            _ => None,
        })
    }

    fn join_room(&mut self) {
        if self.connection != Connection::Connected || self.joined == self.project {
            return;
        }
        let Some(project) = self.project.clone() else {
            return;
        };
        match self.live.join(&project) {
            Ok(()) => self.joined = Some(project),
            Err(e) => warn!(error = %e, "Failed to join project room"),
        }
    }

    fn leave_room(&mut self) {
        if let Some(project) = self.joined.take() {
            if self.connection == Connection::Connected {
                if let Err(e) = self.live.leave(&project) {
                    warn!(error = %e, "Failed to leave project room");
                }
            }
        }
    }

    fn fetch_history(&mut self) {
        let Some(project) = self.project.clone() else {
            return;
        };
        let api = self.api.clone();
        let updates = self.updates.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let result = api.read_messages(&project, None).await;
            let _ = updates.send(ChatUpdate::History { epoch, result });
        });
    }

    fn catch_up(&mut self) {
        if !self.history_loaded {
            // the history fetch in flight covers it
            return;
        }
        let Some(project) = self.project.clone() else {
            return;
        };
        let after = self.last_seen;
        let api = self.api.clone();
        let updates = self.updates.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let result = api.read_messages(&project, after).await;
            let update = match after {
                Some(_) => ChatUpdate::CatchUp { epoch, result },
                None => ChatUpdate::History { epoch, result },
            };
            let _ = updates.send(update);
        });
    }

    /// History goes first; live arrivals received meanwhile follow it
    fn merge_history(&mut self, history: Vec<Message>) {
        let live = std::mem::take(&mut self.messages);
        self.seen.clear();
        self.last_seen = None;
        // history predates outstanding sends; their echoes come live
        for message in history {
            self.receive(message, false);
        }
        for message in live {
            self.insert(message);
        }
        self.history_loaded = true;
        debug!(count = self.messages.len(), "History loaded");
    }

    /// Entry point for every message from the server
    ///
    /// Only live and catch-up arrivals may commit an outgoing message by its
    /// text; history commits by server id alone.
    fn receive(&mut self, message: Message, may_echo: bool) {
        if self.is_duplicate(&message) {
            debug!(id = ?message.id, "Dropping duplicate message");
            return;
        }
        if self.is_mine(&message) {
            let committed = if may_echo {
                self.outbox.commit_echo(&message)
            } else {
                message.id.as_ref().and_then(|id| self.outbox.commit_id(id))
            };
            if let Some(entry) = committed {
                debug!(local_id = %entry.local_id, "Outgoing message committed");
            }
        }
        self.insert(markdown::prepare(message));
    }

    /// Append an already rendered message
    fn insert(&mut self, message: Message) {
        if self.is_duplicate(&message) {
            return;
        }
        if let Some(id) = &message.id {
            self.seen.insert(id.clone());
        }
        // synthesized cards carry no server time and never move the cursor
        if let Some(ts) = message.timestamp() {
            if self.last_seen.map_or(true, |seen| ts > seen) {
                self.last_seen = Some(ts);
            }
        }
        self.messages.push(message);
    }

    fn is_duplicate(&self, message: &Message) -> bool {
        message.id.as_ref().map_or(false, |id| self.seen.contains(id))
    }

    fn is_mine(&self, message: &Message) -> bool {
        self.me.as_ref().map_or(false, |me| me.is(&message.user_id))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn read_upload(path: &Path, name: &str) -> Result<FileUpload> {
    let bytes = tokio::fs::read(path).await.map_err(ReskitError::from)?;
    Ok(FileUpload {
        file_name: name.to_string(),
        mime: AttachmentKind::mime_for(path).to_string(),
        bytes: bytes.into(),
    })
}
