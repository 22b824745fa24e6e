//! Terminal front-end for ResKit
//!
//! The app shell, project sidebar and chat/search viewer rendered as a
//! line-oriented terminal session. [`Terminal::run`] follows [`Route`]s the
//! way a browser follows links: every navigation tears the views down and
//! loads the shell again.

#![warn(missing_docs)]

pub mod command;
pub mod logtail;
pub mod render;
pub mod route;
pub mod shell;
pub mod sidebar;
pub mod terminal;
pub mod viewer;

pub use command::Command;
pub use logtail::LogTailConfig;
pub use route::Route;
pub use shell::{AppShell, ShellLoad};
pub use sidebar::{LinePrompt, Prompt, Sidebar};
pub use terminal::{Terminal, TerminalConfig};
pub use viewer::{resolve_project_id, ViewKind, Viewer};
