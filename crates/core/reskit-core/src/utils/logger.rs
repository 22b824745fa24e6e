//! Logging utilities

use once_cell::sync::OnceCell;
use serde::Serialize;
use std::fmt;
use tokio::sync::broadcast;
use tracing::field::{Field, Visit};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// A log record mirrored to in-process subscribers
#[derive(Clone, Debug, Serialize)]
pub struct LogEvent {
    /// Level name
    pub level: String,
    /// Event target (module path)
    pub target: String,
    /// Rendered message
    pub message: String,
    /// Structured fields in call order, e.g. `project`, `epoch`, `error`
    pub fields: Vec<(String, String)>,
    /// Source file
    pub file: Option<String>,
    /// Source line
    pub line: Option<u32>,
    /// RFC 3339 time
    pub time: String,
}

static LOG_TX: OnceCell<broadcast::Sender<LogEvent>> = OnceCell::new();

/// Subscribe to log events; `None` before [`init_logging`]
pub fn subscribe_logs() -> Option<broadcast::Receiver<LogEvent>> {
    LOG_TX.get().map(|tx| tx.subscribe())
}

/// Splits an event into its message and the remaining key/value fields
#[derive(Default)]
struct EventFields {
    message: String,
    fields: Vec<(String, String)>,
}

impl EventFields {
    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for EventFields {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{:?}", value));
    }

    // strings unquoted, so `%error` and `error = "..."` read the same
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_string());
    }
}

struct BroadcastLayer {
    tx: broadcast::Sender<LogEvent>,
}

impl<S> Layer<S> for BroadcastLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        // nobody tailing; skip the formatting
        if self.tx.receiver_count() == 0 {
            return;
        }
        let mut visitor = EventFields::default();
        event.record(&mut visitor);
        let meta = event.metadata();
        let ev = LogEvent {
            level: meta.level().to_string(),
            target: meta.target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
            file: meta.file().map(|s| s.to_string()),
            line: meta.line(),
            time: chrono::Utc::now().to_rfc3339(),
        };
        let _ = self.tx.send(ev);
    }
}

/// Initialize the global logging system
///
/// Level comes from `RUST_LOG`, then `RESKIT_LOG_LEVEL`, then `info`. Output
/// goes to stderr so it never interleaves with rendered chat on stdout.
pub fn init_logging() {
    let level = std::env::var("RESKIT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into());

    let tx = LOG_TX
        .get_or_init(|| {
            let (tx, _rx) = broadcast::channel(1024);
            tx
        })
        .clone();

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(BroadcastLayer { tx })
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_after_init() {
        init_logging();
        let mut rx = subscribe_logs().expect("initialized");
        tracing::info!(project = 7, error = %"socket closed", "hello from the test");
        // other tests may log concurrently
        let found = tokio::time::timeout(std::time::Duration::from_secs(2), async {
            loop {
                match rx.recv().await {
                    Ok(ev) if ev.message.contains("hello from the test") => return Some(ev),
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(_) => return None,
                }
            }
        })
        .await
        .ok()
        .flatten()
        .expect("event mirrored");
        assert_eq!(found.message, "hello from the test");
        assert_eq!(
            found.fields,
            vec![
                ("project".to_string(), "7".to_string()),
                ("error".to_string(), "socket closed".to_string()),
            ]
        );
    }
}
