//! Compatibility levels enforced by the schema registry

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GitopsError;

/// Rule governing which schema changes the registry accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Compatibility {
    /// Any change is accepted
    None,
    /// New schema can read data written with the previous one
    Backward,
    /// New schema can read data written with every previous one
    BackwardTransitive,
    /// Previous schema can read data written with the new one
    Forward,
    /// Every previous schema can read data written with the new one
    ForwardTransitive,
    /// Backward and forward against the previous schema
    Full,
    /// Backward and forward against every previous schema
    FullTransitive,
}

impl Compatibility {
    pub const ALL: [Compatibility; 7] = [
        Compatibility::None,
        Compatibility::Backward,
        Compatibility::BackwardTransitive,
        Compatibility::Forward,
        Compatibility::ForwardTransitive,
        Compatibility::Full,
        Compatibility::FullTransitive,
    ];

    /// Registry spelling (e.g. `BACKWARD_TRANSITIVE`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Compatibility::None => "NONE",
            Compatibility::Backward => "BACKWARD",
            Compatibility::BackwardTransitive => "BACKWARD_TRANSITIVE",
            Compatibility::Forward => "FORWARD",
            Compatibility::ForwardTransitive => "FORWARD_TRANSITIVE",
            Compatibility::Full => "FULL",
            Compatibility::FullTransitive => "FULL_TRANSITIVE",
        }
    }
}

impl fmt::Display for Compatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compatibility {
    type Err = GitopsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Compatibility::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| GitopsError::UnknownCompatibility(s.to_string()))
    }
}
