//! Registry access seams
//!
//! [`RegistryClient`] is the read-only view the planner needs; it must never
//! mutate the registry. [`RegistryAdmin`] holds the mutations used when a
//! plan is applied. Both are implemented over HTTP by
//! [`HttpRegistryClient`](crate::client::HttpRegistryClient).

use crate::compatibility::Compatibility;
use crate::schema::SchemaDefinition;
use crate::state::Subject;

/// Read-only queries against a live schema registry
pub trait RegistryClient {
    /// Error surfaced unchanged through planning
    type Error: std::error::Error + Send + Sync + 'static;

    /// All subject names currently registered
    fn subjects(&self) -> Result<Vec<String>, Self::Error>;

    /// Compatibility messages for `subject.schema` against the rule for
    /// `subject.name`; empty means compatible
    fn test_compatibility(&self, subject: &Subject) -> Result<Vec<String>, Self::Error>;

    /// Registry-wide default compatibility
    fn global_compatibility(&self) -> Result<Compatibility, Self::Error>;

    /// Registry-wide normalize flag
    fn normalize(&self) -> Result<bool, Self::Error>;

    /// Effective compatibility for one subject
    fn subject_compatibility(&self, name: &str) -> Result<Compatibility, Self::Error>;

    /// Most recently registered schema of a subject
    fn latest_schema(&self, name: &str) -> Result<SchemaDefinition, Self::Error>;

    /// Version under which exactly this schema is already registered, if any
    fn version(&self, subject: &Subject) -> Result<Option<u32>, Self::Error>;
}

/// Mutations performed by the apply step
pub trait RegistryAdmin {
    type Error: std::error::Error + Send + Sync + 'static;

    fn update_global_compatibility(&self, level: Compatibility) -> Result<(), Self::Error>;

    fn update_normalize(&self, normalize: bool) -> Result<(), Self::Error>;

    fn update_subject_compatibility(&self, name: &str, level: Compatibility) -> Result<(), Self::Error>;

    /// Register a schema under `subject.name`, returning the schema id
    fn register(&self, subject: &Subject, normalize: bool) -> Result<u32, Self::Error>;

    /// Delete a subject, returning the versions that were removed
    fn delete_subject(&self, name: &str) -> Result<Vec<u32>, Self::Error>;
}
