//! Schema types and canonical forms
//!
//! Schemas are compared by canonical text only. Avro schemas are canonicalized
//! from the parsed schema, so `"string"` and `{"type": "string"}` or a full
//! name and a name plus namespace are the same schema. JSON schemas differing
//! only in whitespace or key order are the same, and Protobuf ignores comments.
//! A changed `doc` string in an Avro record is a different schema.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{GitopsError, Result};

/// Protobuf tokens that matter for canonicalization; string literals come
/// first so comment markers and whitespace inside them are kept
static PROTO_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'|/\*.*?\*/|//[^\n]*|\s+"#)
        .expect("valid regex")
});

/// Format of a registered schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaType {
    #[default]
    Avro,
    Protobuf,
    Json,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Avro => "AVRO",
            SchemaType::Protobuf => "PROTOBUF",
            SchemaType::Json => "JSON",
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaType {
    type Err = GitopsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "AVRO" => Ok(SchemaType::Avro),
            "PROTOBUF" => Ok(SchemaType::Protobuf),
            "JSON" => Ok(SchemaType::Json),
            other => Err(GitopsError::UnknownSchemaType(other.to_string())),
        }
    }
}

/// Reference from one schema to a type registered under another subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReference {
    /// Name the referencing schema uses (Avro full name, proto import path)
    pub name: String,
    pub subject: String,
    pub version: u32,
}

/// A parsed schema with its canonical form
#[derive(Debug, Clone, Serialize)]
pub struct SchemaDefinition {
    schema_type: SchemaType,
    schema: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    references: Vec<SchemaReference>,
    #[serde(skip)]
    canonical: String,
}

impl SchemaDefinition {
    /// Parse schema text
    ///
    /// `subject` is only used to label errors. Avro and JSON schemas must be
    /// valid JSON and compile with their respective validators; schemas with
    /// references are only checked for JSON syntax since the referenced types
    /// live in other subjects.
    pub fn parse(
        subject: &str,
        schema_type: SchemaType,
        text: impl Into<String>,
        references: Vec<SchemaReference>,
    ) -> Result<Self> {
        let schema = text.into();
        let invalid = |reason: String| GitopsError::InvalidSchema {
            subject: subject.to_string(),
            reason,
        };

        let canonical = match schema_type {
            SchemaType::Avro | SchemaType::Json => {
                let value: serde_json::Value =
                    serde_json::from_str(&schema).map_err(|e| invalid(e.to_string()))?;

                let value = match schema_type {
                    // referenced types live in other subjects, so only the JSON layout is normalized
                    _ if !references.is_empty() => value,
                    SchemaType::Avro => {
                        let parsed =
                            apache_avro::Schema::parse(&value).map_err(|e| invalid(e.to_string()))?;
                        serde_json::to_value(&parsed)?
                    }
                    _ => {
                        jsonschema::JSONSchema::compile(&value).map_err(|e| invalid(e.to_string()))?;
                        value
                    }
                };

                serde_json::to_string(&sort_keys(value))?
            }
            SchemaType::Protobuf => canonical_protobuf(&schema),
        };

        if canonical.is_empty() {
            return Err(invalid("schema is empty".to_string()));
        }

        Ok(Self {
            schema_type,
            schema,
            references,
            canonical,
        })
    }

    pub fn schema_type(&self) -> SchemaType {
        self.schema_type
    }

    /// Schema text as written
    pub fn raw(&self) -> &str {
        &self.schema
    }

    pub fn references(&self) -> &[SchemaReference] {
        &self.references
    }

    /// Normalized text used for every equality check
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Multi-line rendering for human review
    pub fn pretty(&self) -> String {
        match self.schema_type {
            SchemaType::Avro | SchemaType::Json => {
                serde_json::from_str::<serde_json::Value>(&self.canonical)
                    .and_then(|v| serde_json::to_string_pretty(&v))
                    .unwrap_or_else(|_| self.schema.clone())
            }
            SchemaType::Protobuf => self.schema.trim().to_string(),
        }
    }
}

impl PartialEq for SchemaDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for SchemaDefinition {}

/// Rebuild objects with sorted keys, whatever map ordering serde_json uses
fn sort_keys(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            serde_json::Value::Object(entries.into_iter().map(|(k, v)| (k, sort_keys(v))).collect())
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(sort_keys).collect())
        }
        other => other,
    }
}

fn canonical_protobuf(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for token in PROTO_TOKEN.find_iter(text) {
        out.push_str(&text[last..token.start()]);
        let token_text = token.as_str();
        if token_text.starts_with(['"', '\'']) {
            out.push_str(token_text);
        } else if !out.ends_with(' ') {
            out.push(' ');
        }
        last = token.end();
    }
    out.push_str(&text[last..]);

    out.trim().to_string()
}
