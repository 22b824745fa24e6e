//! ResKit client core
//!
//! Shared building blocks for the ResKit research-paper chat and search
//! client:
//!
//! - [`Session`] context owning the auth token lifecycle
//! - [`ApiClient`] with a single rejection policy for every endpoint
//! - [`ResearchApi`], the typed endpoint surface views depend on
//! - The data model (projects, messages, papers, attachments)
//! - Configuration and logging
//!
//! # Example
//!
//! ```no_run
//! use reskit_core::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ClientConfig::from_env()?;
//!     let session = Session::from_file(&config.token_path);
//!     let api = HttpResearchApi::new(ApiClient::new(config, session)?);
//!     for project in api.projects().await? {
//!         println!("{} {}", project.id, project.name);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod error;
pub mod session;
pub mod types;
pub mod utils;

pub use api::{ApiClient, HttpResearchApi, RequestBody, ResearchApi, TOKEN_HEADER};
pub use config::{
    get_env_bool, get_env_int, get_env_or, load_env, load_env_from_path, ClientConfig,
    DEFAULT_BASE_URL,
};
pub use error::{ReskitError, Result};
pub use session::{FileTokenStore, MemoryTokenStore, Session, TokenStore};
pub use types::*;
