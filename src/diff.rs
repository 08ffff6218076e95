//! Reconciliation of desired state against a live registry
//!
//! Planning runs in a fixed order:
//!
//! 1. **Compatibility screen**: every desired schema is tested against the
//!    registry's rules. Failing subjects are reported and take no further
//!    part in the run.
//! 2. **Global settings**: compatibility and normalize are compared.
//! 3. **Set reconciliation**: compatible subjects unknown to the registry are
//!    added, registry subjects missing from the state are deleted (only when
//!    deletes are enabled), the rest are candidates for modification.
//! 4. **Change detection**: each candidate is compared field by field and
//!    kept only when something differs.
//!
//! Planning never mutates the registry. The first failing registry call
//! aborts the run and its error is returned as is.

use std::collections::HashSet;

use tracing::debug;

use crate::plan::{Change, Changes, CompatibilityTestResult, Plan};
use crate::registry::RegistryClient;
use crate::schema::SchemaDefinition;
use crate::state::{State, Subject};

/// Computes a [`Plan`] from a [`State`] and a registry
pub struct Planner<'a, C> {
    client: &'a C,
    enable_deletes: bool,
}

impl<'a, C: RegistryClient> Planner<'a, C> {
    /// Create a planner; deletes are disabled
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            enable_deletes: false,
        }
    }

    /// Report registry subjects missing from the state as deleted
    pub fn enable_deletes(mut self, enable: bool) -> Self {
        self.enable_deletes = enable;
        self
    }

    pub fn plan(&self, state: &State) -> Result<Plan, C::Error> {
        let remote_subjects: HashSet<String> = self.client.subjects()?.into_iter().collect();
        debug!(count = remote_subjects.len(), "fetched registry subjects");

        let (compatible, incompatible) = self.screen(state)?;

        let global_compatibility =
            Change::between(self.client.global_compatibility()?, state.global_compatibility());
        let normalize = Change::between(self.client.normalize()?, state.normalize());

        let deleted = self.deletions(&remote_subjects, state);

        let (added, candidates): (Vec<&Subject>, Vec<&Subject>) = compatible
            .into_iter()
            .partition(|s| !remote_subjects.contains(&s.name));

        let mut modified = Vec::new();
        for subject in candidates.into_iter().filter(|s| !deleted.contains(&s.name)) {
            match self.changes(subject)? {
                Some(changes) => modified.push(changes),
                None => debug!(subject = %subject.name, "unchanged"),
            }
        }

        Ok(Plan {
            global_compatibility,
            normalize,
            incompatible,
            added: added.into_iter().cloned().collect(),
            modified,
            deleted,
        })
    }

    /// Split subjects into compatible ones and failed test results
    fn screen<'s>(
        &self,
        state: &'s State,
    ) -> Result<(Vec<&'s Subject>, Vec<CompatibilityTestResult>), C::Error> {
        let mut compatible = Vec::new();
        let mut incompatible = Vec::new();

        for subject in state.subjects() {
            let result = CompatibilityTestResult {
                subject: subject.clone(),
                messages: self.client.test_compatibility(subject)?,
            };
            if result.is_compatible() {
                compatible.push(subject);
            } else {
                debug!(subject = %subject.name, messages = result.messages.len(), "incompatible");
                incompatible.push(result);
            }
        }

        Ok((compatible, incompatible))
    }

    fn deletions(&self, remote_subjects: &HashSet<String>, state: &State) -> Vec<String> {
        if !self.enable_deletes {
            return Vec::new();
        }

        let mut deleted: Vec<String> = remote_subjects
            .iter()
            .filter(|name| !state.contains(name))
            .cloned()
            .collect();
        deleted.sort();
        deleted
    }

    fn changes(&self, subject: &Subject) -> Result<Option<Changes>, C::Error> {
        let compatibility = Change::between(
            self.client.subject_compatibility(&subject.name)?,
            subject.compatibility,
        );
        let schema = self.schema_change(subject)?;

        Ok(Changes::new(subject.clone(), compatibility, schema))
    }

    /// A schema is unchanged only when it matches the latest one and that
    /// exact content is also found as a registered version.
    fn schema_change(&self, subject: &Subject) -> Result<Option<Change<SchemaDefinition>>, C::Error> {
        let latest = self.client.latest_schema(&subject.name)?;

        if latest.canonical() != subject.schema.canonical() || self.client.version(subject)?.is_none() {
            return Ok(Some(Change::new(latest, subject.schema.clone())));
        }

        Ok(None)
    }
}
