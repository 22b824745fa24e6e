//! Data model shared by every view

pub mod attachment;
pub mod message;
pub mod paper;
pub mod primitives;
pub mod project;
pub mod search;
pub mod user;

pub use attachment::*;
pub use message::*;
pub use paper::*;
pub use primitives::*;
pub use project::*;
pub use search::*;
pub use user::*;
