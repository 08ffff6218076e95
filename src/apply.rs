//! Executes a plan against the registry
//!
//! Order: global compatibility, normalize, added subjects, modified
//! subjects, deleted subjects. A plan with incompatible subjects is refused
//! before anything is touched.

use tracing::{info, warn};

use crate::error::GitopsError;
use crate::plan::Plan;
use crate::registry::RegistryAdmin;

/// What an apply run changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Subject name and schema id for every registration
    pub registered: Vec<(String, u32)>,
    pub compatibility_updates: usize,
    pub settings_updates: usize,
    pub deleted: Vec<String>,
}

/// Applies plans through a [`RegistryAdmin`]
pub struct Applier<'a, A> {
    admin: &'a A,
    normalize: bool,
}

impl<'a, A> Applier<'a, A>
where
    A: RegistryAdmin,
    GitopsError: From<A::Error>,
{
    pub fn new(admin: &'a A) -> Self {
        Self {
            admin,
            normalize: false,
        }
    }

    /// Ask the registry to normalize schemas on registration
    pub fn normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn apply(&self, plan: &Plan) -> Result<ApplyReport, GitopsError> {
        if !plan.incompatible.is_empty() {
            let names: Vec<String> = plan.incompatible.iter().map(|r| r.subject.name.clone()).collect();
            warn!(subjects = ?names, "refusing to apply plan with incompatible subjects");
            return Err(GitopsError::IncompatibleSubjects(names));
        }

        info!(subjects = ?plan.subject_names(), "applying plan");
        let mut report = ApplyReport::default();

        if let Some(change) = &plan.global_compatibility {
            info!(before = %change.before, after = %change.after, "updating global compatibility");
            self.admin.update_global_compatibility(change.after)?;
            report.settings_updates += 1;
        }

        if let Some(change) = &plan.normalize {
            info!(before = change.before, after = change.after, "updating normalize");
            self.admin.update_normalize(change.after)?;
            report.settings_updates += 1;
        }

        for subject in &plan.added {
            let id = self.admin.register(subject, self.normalize)?;
            info!(subject = %subject.name, id, "registered new subject");
            report.registered.push((subject.name.clone(), id));

            if let Some(level) = subject.compatibility {
                self.admin.update_subject_compatibility(&subject.name, level)?;
                info!(subject = %subject.name, compatibility = %level, "set compatibility");
                report.compatibility_updates += 1;
            }
        }

        for changes in &plan.modified {
            let name = &changes.subject.name;

            if let Some(change) = &changes.compatibility {
                self.admin.update_subject_compatibility(name, change.after)?;
                info!(subject = %name, before = %change.before, after = %change.after, "updated compatibility");
                report.compatibility_updates += 1;
            }

            if changes.schema.is_some() {
                let id = self.admin.register(&changes.subject, self.normalize)?;
                info!(subject = %name, id, "registered new schema version");
                report.registered.push((name.clone(), id));
            }
        }

        for name in &plan.deleted {
            let versions = self.admin.delete_subject(name)?;
            info!(subject = %name, versions = ?versions, "deleted subject");
            report.deleted.push(name.clone());
        }

        Ok(report)
    }
}
