//! Search request/response types

use super::Paper;
use crate::ReskitError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category filter for paper search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchCategory {
    /// Everything
    #[default]
    All,
    /// Paper titles and abstracts
    Papers,
    /// Author names
    Authors,
    /// Topics
    Topics,
}

impl SearchCategory {
    /// Every category, in chip order
    pub const ALL: [SearchCategory; 4] = [
        SearchCategory::All,
        SearchCategory::Papers,
        SearchCategory::Authors,
        SearchCategory::Topics,
    ];

    /// Query-string value
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchCategory::All => "all",
            SearchCategory::Papers => "papers",
            SearchCategory::Authors => "authors",
            SearchCategory::Topics => "topics",
        }
    }

    /// Chip label
    pub fn label(&self) -> &'static str {
        match self {
            SearchCategory::All => "All",
            SearchCategory::Papers => "Papers",
            SearchCategory::Authors => "Authors",
            SearchCategory::Topics => "Topics",
        }
    }
}

impl fmt::Display for SearchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchCategory {
    type Err = ReskitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(SearchCategory::All),
            "papers" => Ok(SearchCategory::Papers),
            "authors" => Ok(SearchCategory::Authors),
            "topics" => Ok(SearchCategory::Topics),
            other => Err(ReskitError::validation(format!(
                "unknown search category '{}' (expected all, papers, authors or topics)",
                other
            ))),
        }
    }
}

/// Response of `GET /api/search`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    /// Matching papers; missing means none
    #[serde(default)]
    pub results: Vec<Paper>,
}
