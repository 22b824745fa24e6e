//! Projects

use super::ProjectId;
use serde::{Deserialize, Serialize};

/// A conversation/workspace scope threading messages and uploaded files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Project id
    pub id: ProjectId,

    /// Display name
    pub name: String,

    /// Owning user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    /// Visible to non-members
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,

    /// Member user ids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<String>>,
}

/// Body of `POST /api/projects`
#[derive(Debug, Clone, Serialize)]
pub struct CreateProjectRequest {
    /// Name for the new project
    pub name: String,
}

/// Response of `POST /api/projects`
///
/// Some deployments wrap the project as `{"project": {...}}`, others return
/// the object itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CreatedProject {
    /// `{"project": {...}}`
    Wrapped {
        /// The created project
        project: Project,
    },
    /// The project object itself
    Bare(Project),
}

impl CreatedProject {
    /// Unwrap to the project
    pub fn into_project(self) -> Project {
        match self {
            CreatedProject::Wrapped { project } => project,
            CreatedProject::Bare(project) => project,
        }
    }
}
