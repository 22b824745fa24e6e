//! App shell: who is signed in and which projects they have

use crate::route::Route;
use reskit_core::{Project, ResearchApi, Session, User};
use tracing::{error, info};

/// Everything the shell loads before showing a view
#[derive(Debug, Clone)]
pub struct AppShell {
    /// Signed-in user
    pub user: User,
    /// Projects in server order
    pub projects: Vec<Project>,
}

/// Result of loading the shell
#[derive(Debug, Clone)]
pub enum ShellLoad {
    /// Shell ready
    Ready(AppShell),
    /// Go somewhere else instead
    Redirect(Route),
}

impl AppShell {
    /// Load profile and projects in parallel
    ///
    /// Without a stored token nothing is requested and the shell redirects to
    /// `/auth`; a failed profile fetch does the same. A failed project fetch
    /// leaves the list empty.
    pub async fn load(api: &dyn ResearchApi, session: &Session) -> ShellLoad {
        if !session.is_authenticated() {
            info!("No auth token; redirecting to /auth");
            return ShellLoad::Redirect(Route::Auth);
        }

        let (profile, projects) = tokio::join!(api.profile(), api.projects());

        let user = match profile {
            Ok(user) => user,
            Err(e) => {
                error!(error = %e, "Error fetching profile");
                return ShellLoad::Redirect(Route::Auth);
            }
        };
        let projects = projects.unwrap_or_else(|e| {
            error!(error = %e, "Error fetching projects");
            Vec::new()
        });

        info!(user = %user.username, projects = projects.len(), "Shell loaded");
        ShellLoad::Ready(AppShell { user, projects })
    }
}
