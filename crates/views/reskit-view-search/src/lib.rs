//! Paper search view for ResKit
//!
//! A single-shot query against `GET /api/search`. Each request carries a
//! sequence number and only the latest one may change the view.

#![warn(missing_docs)]

pub mod view;

pub use view::{SearchUpdate, SearchView};
