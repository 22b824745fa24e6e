//! Project list and navigation

use crate::route::Route;
use async_trait::async_trait;
use reskit_core::{Project, ProjectId, ResearchApi};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{error, info};

/// Asks the user a question and waits for the answer
#[async_trait]
pub trait Prompt: Send {
    /// `None` when the user cancels
    async fn ask(&mut self, question: &str) -> Option<String>;
}

/// [`Prompt`] answered by the next line read from the terminal
pub struct LinePrompt<'a, W> {
    lines: &'a mut mpsc::UnboundedReceiver<String>,
    out: W,
}

impl<'a, W> LinePrompt<'a, W> {
    /// Prompt over an input line channel and an output sink
    pub fn new(lines: &'a mut mpsc::UnboundedReceiver<String>, out: W) -> Self {
        Self { lines, out }
    }
}

#[async_trait]
impl<W> Prompt for LinePrompt<'_, W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn ask(&mut self, question: &str) -> Option<String> {
        let _ = self.out.write_all(format!("{} ", question).as_bytes()).await;
        let _ = self.out.flush().await;
        self.lines.recv().await
    }
}

/// The user's projects
#[derive(Debug, Clone, Default)]
pub struct Sidebar {
    projects: Vec<Project>,
    active: Option<ProjectId>,
}

impl Sidebar {
    /// Sidebar over a loaded project list
    pub fn new(projects: Vec<Project>, active: Option<ProjectId>) -> Self {
        Self { projects, active }
    }

    /// Projects in display order
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// Highlighted project
    pub fn active(&self) -> Option<&ProjectId> {
        self.active.as_ref()
    }

    /// Ask for a name and create a project with it
    ///
    /// Blank or cancelled input does nothing. On success the project is
    /// appended and the route to open it is returned.
    pub async fn create_project(
        &mut self,
        api: &dyn ResearchApi,
        prompt: &mut dyn Prompt,
    ) -> Option<Route> {
        let name = prompt.ask("Enter project name:").await?;
        self.create_named(api, &name).await
    }

    /// Create a project with a known name
    pub async fn create_named(&mut self, api: &dyn ResearchApi, name: &str) -> Option<Route> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        match api.create_project(name).await {
            Ok(project) => {
                info!(id = %project.id, name = %project.name, "Project created");
                let route = self.open_project(project.id.clone());
                self.projects.push(project);
                Some(route)
            }
            Err(e) => {
                error!(error = %e, "Error creating project");
                None
            }
        }
    }

    /// Route to a project
    pub fn open_project(&self, id: ProjectId) -> Route {
        Route::project(id)
    }

    /// Route to the sign-in page
    pub fn go_to_auth(&self) -> Route {
        Route::Auth
    }
}
