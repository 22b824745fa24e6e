//! Client routes
//!
//! Navigation is a full reload: the driver tears down every view and loads
//! the shell again for the new route.

use reskit_core::{ProjectId, ReskitError, Result};
use std::fmt;
use std::str::FromStr;

/// Where the client is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/auth`
    Auth,
    /// `/app[?project_id=<id>]`
    App {
        /// Project requested by the route
        project_id: Option<ProjectId>,
    },
}

impl Route {
    /// `/app` for a project
    pub fn project(id: ProjectId) -> Self {
        Self::App {
            project_id: Some(id),
        }
    }

    /// Path form, e.g. `/app?project_id=42`
    pub fn to_path(&self) -> String {
        match self {
            Self::Auth => "/auth".to_string(),
            Self::App { project_id: None } => "/app".to_string(),
            Self::App {
                project_id: Some(id),
            } => {
                let qs = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("project_id", &id.to_string())
                    .finish();
                format!("/app?{}", qs)
            }
        }
    }
}

impl FromStr for Route {
    type Err = ReskitError;

    fn from_str(path: &str) -> Result<Self> {
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path, query),
            None => (path, ""),
        };
        match path.trim_end_matches('/') {
            "/auth" => Ok(Self::Auth),
            "" | "/app" => {
                let project_id = url::form_urlencoded::parse(query.as_bytes())
                    .find(|(key, value)| key == "project_id" && !value.is_empty())
                    .map(|(_, value)| {
                        value
                            .parse::<ProjectId>()
                            .unwrap_or_else(|never| match never {})
                    });
                Ok(Self::App { project_id })
            }
            other => Err(ReskitError::validation(format!("unknown route '{}'", other))),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reskit_core::Id;

    #[test]
    fn test_parse_routes() {
        assert_eq!("/auth".parse::<Route>().unwrap(), Route::Auth);
        assert_eq!(
            "/app".parse::<Route>().unwrap(),
            Route::App { project_id: None }
        );
        assert_eq!(
            "/app?project_id=42".parse::<Route>().unwrap(),
            Route::project(Id::Numeric(42))
        );
        assert_eq!(
            "/app?project_id=3f2a-77".parse::<Route>().unwrap(),
            Route::project(Id::Text("3f2a-77".into()))
        );
        assert_eq!(
            "/app?project_id=".parse::<Route>().unwrap(),
            Route::App { project_id: None }
        );
        assert!("/settings".parse::<Route>().is_err());
    }

    #[test]
    fn test_path_form() {
        assert_eq!(Route::project(Id::Numeric(7)).to_path(), "/app?project_id=7");
        assert_eq!(Route::Auth.to_string(), "/auth");
    }
}
