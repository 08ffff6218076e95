//! Schema GitOps
//!
//! Declarative management of a Confluent-compatible schema registry: subjects,
//! their schemas and compatibility levels, and the registry-wide settings are
//! described in a YAML state file and reconciled against the live registry.
//!
//! ## Features
//!
//! - **Plan**: Compute every difference between desired and live state without touching the registry
//! - **Compatibility Screen**: Schemas the registry would reject are reported, not planned
//! - **Canonical Comparison**: Formatting never shows up as a change
//! - **Opt-in Deletes**: Registry subjects missing from the state are only removed when asked
//! - **Apply**: Execute a reviewed plan
//!
//! ## Architecture
//!
//! ```text
//! state.yaml ──> StateLoader ──> State ─┐
//!                                       ├──> Planner ──> Plan ──> render / Applier
//! HttpRegistryClient (RegistryClient) ──┘
//! ```

pub mod apply;
pub mod client;
pub mod compatibility;
pub mod config;
pub mod diff;
pub mod error;
pub mod loader;
pub mod plan;
pub mod registry;
pub mod render;
pub mod schema;
pub mod state;

pub use apply::{Applier, ApplyReport};
pub use client::HttpRegistryClient;
pub use compatibility::Compatibility;
pub use config::GitopsConfig;
pub use diff::Planner;
pub use error::{GitopsError, Result};
pub use loader::StateLoader;
pub use plan::{Change, Changes, CompatibilityTestResult, Plan};
pub use registry::{RegistryAdmin, RegistryClient};
pub use schema::{SchemaDefinition, SchemaReference, SchemaType};
pub use state::{State, Subject};
