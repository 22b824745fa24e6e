//! Input lines to commands

use crate::viewer::ViewKind;
use reskit_core::{ProjectId, SearchCategory};
use std::path::PathBuf;

/// Help text printed by `/help`
pub const HELP: &str = "\
Commands:
  <text>               send a message (chat) or search (search view)
  /chat, /search       switch view
  /category <name>     search category: all, papers, authors, topics
  /projects            list projects
  /open <id>           open a project
  /new [name]          create a project
  /attach <path>...    upload files for the next message
  /detach <file id>    drop an uploaded file
  /history             reprint the conversation
  /logout              sign out
  /quit                exit";

/// One parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Free text for the active view
    Text(String),
    /// Switch view
    View(ViewKind),
    /// Set search category
    Category(SearchCategory),
    /// List projects
    Projects,
    /// Open a project
    Open(ProjectId),
    /// Create a project; prompt when no name is given
    New(Option<String>),
    /// Upload files
    Attach(Vec<PathBuf>),
    /// Remove an uploaded file
    Detach(String),
    /// Reprint the timeline
    History,
    /// Sign out
    Logout,
    /// Print help
    Help,
    /// Exit
    Quit,
    /// Nothing to do
    Empty,
    /// Unrecognised or malformed input
    Invalid(String),
}

impl Command {
    /// Parse a line typed by the user
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Self::Text(line.trim_end_matches(|c: char| c == '\r' || c == '\n').to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match name.to_ascii_lowercase().as_str() {
            "chat" => Self::View(ViewKind::Chat),
            "search" => Self::View(ViewKind::Search),
            "category" | "cat" => match arg.parse() {
                Ok(category) => Self::Category(category),
                Err(_) => Self::Invalid(format!("unknown category '{}'", arg)),
            },
            "projects" | "ls" => Self::Projects,
            "open" if !arg.is_empty() => {
                Self::Open(arg.parse().unwrap_or_else(|never| match never {}))
            }
            "open" => Self::Invalid("usage: /open <project id>".to_string()),
            "new" => Self::New((!arg.is_empty()).then(|| arg.to_string())),
            "attach" if !arg.is_empty() => {
                Self::Attach(arg.split_whitespace().map(PathBuf::from).collect())
            }
            "attach" => Self::Invalid("usage: /attach <path>...".to_string()),
            "detach" if !arg.is_empty() => Self::Detach(arg.to_string()),
            "detach" => Self::Invalid("usage: /detach <file id>".to_string()),
            "history" => Self::History,
            "logout" => Self::Logout,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => Self::Invalid(format!("unknown command '/{}'", other)),
        }
    }
}
