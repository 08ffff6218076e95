//! Desired registry state
//!
//! Every optional field means "leave it alone": an unset compatibility is
//! never compared against the registry and never produces a change.

use std::collections::HashSet;

use serde::Serialize;

use crate::compatibility::Compatibility;
use crate::error::{GitopsError, Result};
use crate::schema::SchemaDefinition;

/// A named, independently versioned schema slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subject {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<Compatibility>,
    pub schema: SchemaDefinition,
}

impl Subject {
    pub fn new(
        name: impl Into<String>,
        compatibility: Option<Compatibility>,
        schema: SchemaDefinition,
    ) -> Self {
        Self {
            name: name.into(),
            compatibility,
            schema,
        }
    }
}

/// Root desired-state document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct State {
    global_compatibility: Option<Compatibility>,
    normalize: Option<bool>,
    subjects: Vec<Subject>,
}

impl State {
    /// Build a state, rejecting duplicate subject names
    pub fn new(
        global_compatibility: Option<Compatibility>,
        normalize: Option<bool>,
        subjects: Vec<Subject>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for subject in &subjects {
            if !seen.insert(subject.name.as_str()) {
                return Err(GitopsError::DuplicateSubject(subject.name.clone()));
            }
        }

        Ok(Self {
            global_compatibility,
            normalize,
            subjects,
        })
    }

    pub fn global_compatibility(&self) -> Option<Compatibility> {
        self.global_compatibility
    }

    pub fn normalize(&self) -> Option<bool> {
        self.normalize
    }

    /// Subjects in declaration order
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn subject(&self, name: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.subject(name).is_some()
    }
}
