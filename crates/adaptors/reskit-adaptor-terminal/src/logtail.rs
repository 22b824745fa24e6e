//! Mirror log events into the terminal, with secrets redacted

use crate::render::redact;
use reskit_core::utils::{subscribe_logs, LogEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Which log events reach the screen
#[derive(Debug, Clone, Default)]
pub struct LogTailConfig {
    /// Tail at all
    pub enabled: bool,
    /// Only events whose target or message contains this (case-insensitive)
    pub target_filter: Option<String>,
    /// Include info and debug events, not only warnings and errors
    pub verbose: bool,
}

impl LogTailConfig {
    /// Whether an event passes the filters
    pub fn accepts(&self, event: &LogEvent) -> bool {
        if !self.verbose && !matches!(event.level.as_str(), "WARN" | "ERROR") {
            return false;
        }
        match &self.target_filter {
            Some(filter) => {
                let filter = filter.to_lowercase();
                event.message.to_lowercase().contains(&filter)
                    || event.target.to_lowercase().contains(&filter)
            }
            None => true,
        }
    }
}

/// One screen line for an event, fields appended as `key=value`
pub fn format_event(event: &LogEvent) -> String {
    let mut line = format!("! [{}] {}: {}", event.level, event.target, event.message);
    for (key, value) in &event.fields {
        line.push_str(&format!(" {}={}", key, value));
    }
    redact(&line)
}

/// Start printing log events; `None` when disabled or logging is not set up
pub fn spawn_log_tail(config: LogTailConfig) -> Option<JoinHandle<()>> {
    if !config.enabled {
        return None;
    }
    let mut rx = subscribe_logs()?;
    Some(tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if config.accepts(&event) {
                        println!("{}", format_event(&event));
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(level: &str, target: &str, message: &str) -> LogEvent {
        LogEvent {
            level: level.to_string(),
            target: target.to_string(),
            message: message.to_string(),
            fields: Vec::new(),
            file: None,
            line: None,
            time: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_filters() {
        let quiet = LogTailConfig {
            enabled: true,
            ..Default::default()
        };
        assert!(quiet.accepts(&event("ERROR", "reskit_view_chat::view", "Error sending message")));
        assert!(!quiet.accepts(&event("INFO", "reskit_view_chat::view", "History loaded")));

        let filtered = LogTailConfig {
            enabled: true,
            target_filter: Some("LIVE".into()),
            verbose: true,
        };
        assert!(filtered.accepts(&event("INFO", "reskit_provider_live::client", "connected")));
        assert!(!filtered.accepts(&event("WARN", "reskit_core::api", "API call rejected")));
    }

    #[test]
    fn test_format_redacts() {
        let line = format_event(&event("WARN", "reskit_core::api", "bad token=abcdefgh12345"));
        assert_eq!(line, "! [WARN] reskit_core::api: bad token=REDACTED");
    }

    #[test]
    fn test_format_redacts_fields() {
        let mut ev = event("ERROR", "reskit_core::api", "Request failed");
        ev.fields = vec![
            ("status".into(), "401".into()),
            ("token".into(), "abcdefgh12345".into()),
            ("user".into(), "ada@example.org".into()),
        ];
        assert_eq!(
            format_event(&ev),
            "! [ERROR] reskit_core::api: Request failed status=401 token=REDACTED user=email@redacted"
        );
    }
}
