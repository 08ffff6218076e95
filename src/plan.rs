//! Change plan produced by reconciliation

use serde::Serialize;

use crate::compatibility::Compatibility;
use crate::schema::SchemaDefinition;
use crate::state::Subject;

/// A live value and the desired value replacing it
///
/// Only ever built when the two differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change<T> {
    pub before: T,
    pub after: T,
}

impl<T> Change<T> {
    pub fn new(before: T, after: T) -> Self {
        Self { before, after }
    }
}

impl<T: PartialEq> Change<T> {
    /// Change from `live` to `desired`, or `None` when desired is unset or equal
    pub fn between(live: T, desired: Option<T>) -> Option<Self> {
        match desired {
            Some(desired) if desired != live => Some(Self::new(live, desired)),
            _ => None,
        }
    }
}

/// Outcome of testing a desired schema against the registry's rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityTestResult {
    pub subject: Subject,
    pub messages: Vec<String>,
}

impl CompatibilityTestResult {
    pub fn is_compatible(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Differences detected for one existing subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Changes {
    pub subject: Subject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<Change<Compatibility>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Change<SchemaDefinition>>,
}

impl Changes {
    /// Record for `subject`, or `None` when nothing changed
    pub fn new(
        subject: Subject,
        compatibility: Option<Change<Compatibility>>,
        schema: Option<Change<SchemaDefinition>>,
    ) -> Option<Self> {
        if compatibility.is_none() && schema.is_none() {
            return None;
        }

        Some(Self {
            subject,
            compatibility,
            schema,
        })
    }
}

/// Every difference between desired and live registry state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Plan {
    pub global_compatibility: Option<Change<Compatibility>>,
    pub normalize: Option<Change<bool>>,
    pub incompatible: Vec<CompatibilityTestResult>,
    pub added: Vec<Subject>,
    pub modified: Vec<Changes>,
    pub deleted: Vec<String>,
}

impl Plan {
    /// True when there is nothing to review
    ///
    /// A pending normalize change alone does not make a plan non-empty.
    pub fn is_empty(&self) -> bool {
        self.global_compatibility.is_none()
            && self.incompatible.is_empty()
            && self.added.is_empty()
            && self.modified.is_empty()
            && self.deleted.is_empty()
    }

    /// Names of every subject the plan touches, in category order
    pub fn subject_names(&self) -> Vec<&str> {
        self.incompatible
            .iter()
            .map(|r| r.subject.name.as_str())
            .chain(self.added.iter().map(|s| s.name.as_str()))
            .chain(self.modified.iter().map(|c| c.subject.name.as_str()))
            .chain(self.deleted.iter().map(String::as_str))
            .collect()
    }
}
