//! YAML state file loading
//!
//! ## Example state file:
//! ```yaml
//! compatibility: BACKWARD
//! normalize: true
//! subjects:
//!   - name: orders-value
//!     compatibility: FULL
//!     file: schemas/orders.avsc
//!   - name: payments-value
//!     type: PROTOBUF
//!     schema: |
//!       syntax = "proto3";
//!       message Payment { string id = 1; }
//!     references:
//!       - name: common/money.proto
//!         subject: money-value
//!         version: 1
//! ```
//!
//! Schema files are resolved relative to the directory of the state file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::compatibility::Compatibility;
use crate::error::{GitopsError, Result};
use crate::schema::{SchemaDefinition, SchemaReference, SchemaType};
use crate::state::{State, Subject};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StateDocument {
    #[serde(default)]
    compatibility: Option<String>,
    #[serde(default)]
    normalize: Option<bool>,
    #[serde(default)]
    subjects: Vec<SubjectDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SubjectDocument {
    name: String,
    #[serde(default)]
    compatibility: Option<String>,
    #[serde(default, rename = "type")]
    schema_type: Option<String>,
    #[serde(default)]
    file: Option<PathBuf>,
    #[serde(default)]
    schema: Option<String>,
    #[serde(default)]
    references: Vec<SchemaReference>,
}

/// Loads a [`State`] from a YAML document
pub struct StateLoader;

impl StateLoader {
    /// Load a state file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<State> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| GitopsError::io(path, e))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        debug!(path = %path.display(), "loading state file");
        Self::parse_str(&content, base_dir)
    }

    /// Parse a state document, resolving schema files against `base_dir`
    pub fn parse_str(content: &str, base_dir: &Path) -> Result<State> {
        if content.trim().is_empty() {
            return Err(GitopsError::InvalidState("state document is empty".to_string()));
        }

        let document: StateDocument = serde_yaml::from_str(content)?;

        let global_compatibility = document
            .compatibility
            .as_deref()
            .map(str::parse::<Compatibility>)
            .transpose()?;

        let subjects = document
            .subjects
            .into_iter()
            .map(|doc| Self::subject(doc, base_dir))
            .collect::<Result<Vec<_>>>()?;

        State::new(global_compatibility, document.normalize, subjects)
    }

    fn subject(doc: SubjectDocument, base_dir: &Path) -> Result<Subject> {
        if doc.name.trim().is_empty() {
            return Err(GitopsError::InvalidState("subject name must not be empty".to_string()));
        }

        let compatibility = doc
            .compatibility
            .as_deref()
            .map(str::parse::<Compatibility>)
            .transpose()?;

        let schema_type = doc
            .schema_type
            .as_deref()
            .map(str::parse::<SchemaType>)
            .transpose()?
            .unwrap_or_default();

        let text = match (doc.file, doc.schema) {
            (Some(file), None) => {
                let path = base_dir.join(file);
                fs::read_to_string(&path).map_err(|e| GitopsError::io(&path, e))?
            }
            (None, Some(inline)) => inline,
            (Some(_), Some(_)) => {
                return Err(GitopsError::InvalidState(format!(
                    "subject '{}' sets both 'file' and 'schema'",
                    doc.name
                )))
            }
            (None, None) => {
                return Err(GitopsError::InvalidState(format!(
                    "subject '{}' needs either 'file' or 'schema'",
                    doc.name
                )))
            }
        };

        let schema = SchemaDefinition::parse(&doc.name, schema_type, text, doc.references)?;
        Ok(Subject::new(doc.name, compatibility, schema))
    }
}
