//! Which view is active, for which project

use reskit_core::{Project, ProjectId, ReskitError, Result};
use std::fmt;
use std::str::FromStr;

/// The views the viewer can show
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewKind {
    /// Project chat
    #[default]
    Chat,
    /// Paper search
    Search,
}

impl ViewKind {
    /// Name used in commands and the prompt
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Search => "search",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewKind {
    type Err = ReskitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" => Ok(Self::Chat),
            "search" => Ok(Self::Search),
            other => Err(ReskitError::validation(format!("unknown view '{}'", other))),
        }
    }
}

/// Route project, else the first project, else none
pub fn resolve_project_id(requested: Option<&ProjectId>, projects: &[Project]) -> Option<ProjectId> {
    requested
        .cloned()
        .or_else(|| projects.first().map(|p| p.id.clone()))
}

/// Active view and project
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    kind: ViewKind,
    project: Option<ProjectId>,
}

impl Viewer {
    /// Viewer for a loaded shell
    pub fn new(requested: Option<&ProjectId>, projects: &[Project]) -> Self {
        Self {
            kind: ViewKind::default(),
            project: resolve_project_id(requested, projects),
        }
    }

    /// Active view
    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    /// Switch view; returns whether it changed
    pub fn switch(&mut self, kind: ViewKind) -> bool {
        let changed = self.kind != kind;
        self.kind = kind;
        changed
    }

    /// Active project
    pub fn project(&self) -> Option<&ProjectId> {
        self.project.as_ref()
    }
}
