//! Identifier types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Server-assigned identifier
///
/// The service hands out integer ids in some places and UUID strings in
/// others. The JSON form is preserved: numeric ids go back out as numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// Integer id, e.g. `42`
    Numeric(i64),
    /// String id, e.g. a UUID
    Text(String),
}

/// Project identifier
pub type ProjectId = Id;

/// Message identifier
pub type MessageId = Id;

impl Id {
    /// Id as it appears in URLs and room names
    pub fn as_path_segment(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Numeric(n) => write!(f, "{}", n),
            Id::Text(s) => f.write_str(s),
        }
    }
}

impl FromStr for Id {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(n) => Id::Numeric(n),
            Err(_) => Id::Text(s.to_string()),
        })
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Numeric(n)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| Id::Text(s.to_string()))
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::from(s.as_str())
    }
}
