//! In-memory registry for integration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use schema_gitops::{
    Compatibility, GitopsError, RegistryAdmin, RegistryClient, SchemaDefinition, SchemaType, Subject,
};

pub const HELLO: &str = r#"{"type": "record", "name": "HelloWorld", "namespace": "dev.gitops",
    "doc": "greeting", "fields": [{"name": "greeting", "type": "string"}]}"#;

pub const HELLO_V2: &str = r#"{"type": "record", "name": "HelloWorld", "namespace": "dev.gitops",
    "doc": "greeting", "fields": [{"name": "greeting", "type": "string"},
    {"name": "name", "type": ["null", "string"], "default": null}]}"#;

pub fn avro(text: &str) -> SchemaDefinition {
    SchemaDefinition::parse("test", SchemaType::Avro, text, vec![]).unwrap()
}

pub fn subject(name: &str, compatibility: Option<Compatibility>, text: &str) -> Subject {
    Subject::new(name, compatibility, avro(text))
}

#[derive(Default)]
struct Inner {
    global: Option<Compatibility>,
    normalize: bool,
    overrides: HashMap<String, Compatibility>,
    versions: BTreeMap<String, Vec<(u32, SchemaDefinition)>>,
    rejected: HashSet<String>,
    ids: HashMap<String, u32>,
}

/// A registry that keeps everything in memory
#[derive(Default)]
pub struct InMemoryRegistry {
    inner: RefCell<Inner>,
}

impl InMemoryRegistry {
    pub fn new(global: Compatibility) -> Self {
        let registry = Self::default();
        registry.inner.borrow_mut().global = Some(global);
        registry
    }

    /// Register `text` under `name` directly
    pub fn seed(&self, name: &str, text: &str) -> u32 {
        self.register(&subject(name, None, text), false).unwrap()
    }

    pub fn set_override(&self, name: &str, level: Compatibility) {
        self.inner.borrow_mut().overrides.insert(name.to_string(), level);
    }

    pub fn set_normalize(&self, normalize: bool) {
        self.inner.borrow_mut().normalize = normalize;
    }

    /// Make compatibility tests fail for `name`
    pub fn reject(&self, name: &str) {
        self.inner.borrow_mut().rejected.insert(name.to_string());
    }

    pub fn version_count(&self, name: &str) -> usize {
        self.inner.borrow().versions.get(name).map_or(0, Vec::len)
    }

    fn not_found(name: &str) -> GitopsError {
        GitopsError::Registry {
            status: 404,
            message: format!("Subject '{name}' not found."),
        }
    }
}

impl RegistryClient for InMemoryRegistry {
    type Error = GitopsError;

    fn subjects(&self) -> Result<Vec<String>, GitopsError> {
        Ok(self.inner.borrow().versions.keys().cloned().collect())
    }

    fn test_compatibility(&self, subject: &Subject) -> Result<Vec<String>, GitopsError> {
        if self.inner.borrow().rejected.contains(&subject.name) {
            return Ok(vec![format!("{}: reader field missing default", subject.name)]);
        }
        Ok(Vec::new())
    }

    fn global_compatibility(&self) -> Result<Compatibility, GitopsError> {
        Ok(self.inner.borrow().global.unwrap_or(Compatibility::Backward))
    }

    fn normalize(&self) -> Result<bool, GitopsError> {
        Ok(self.inner.borrow().normalize)
    }

    fn subject_compatibility(&self, name: &str) -> Result<Compatibility, GitopsError> {
        match self.inner.borrow().overrides.get(name) {
            Some(level) => Ok(*level),
            None => self.global_compatibility(),
        }
    }

    fn latest_schema(&self, name: &str) -> Result<SchemaDefinition, GitopsError> {
        self.inner
            .borrow()
            .versions
            .get(name)
            .and_then(|versions| versions.last())
            .map(|(_, schema)| schema.clone())
            .ok_or_else(|| Self::not_found(name))
    }

    fn version(&self, subject: &Subject) -> Result<Option<u32>, GitopsError> {
        Ok(self.inner.borrow().versions.get(&subject.name).and_then(|versions| {
            versions
                .iter()
                .find(|(_, schema)| schema == &subject.schema)
                .map(|(version, _)| *version)
        }))
    }
}

impl RegistryAdmin for InMemoryRegistry {
    type Error = GitopsError;

    fn update_global_compatibility(&self, level: Compatibility) -> Result<(), GitopsError> {
        self.inner.borrow_mut().global = Some(level);
        Ok(())
    }

    fn update_normalize(&self, normalize: bool) -> Result<(), GitopsError> {
        self.inner.borrow_mut().normalize = normalize;
        Ok(())
    }

    fn update_subject_compatibility(&self, name: &str, level: Compatibility) -> Result<(), GitopsError> {
        self.set_override(name, level);
        Ok(())
    }

    fn register(&self, subject: &Subject, _normalize: bool) -> Result<u32, GitopsError> {
        let mut inner = self.inner.borrow_mut();

        let next_id = inner.ids.len() as u32 + 1;
        let id = *inner
            .ids
            .entry(subject.schema.canonical().to_string())
            .or_insert(next_id);

        let versions = inner.versions.entry(subject.name.clone()).or_default();
        if !versions.iter().any(|(_, schema)| schema == &subject.schema) {
            let version = versions.len() as u32 + 1;
            versions.push((version, subject.schema.clone()));
        }

        Ok(id)
    }

    fn delete_subject(&self, name: &str) -> Result<Vec<u32>, GitopsError> {
        let mut inner = self.inner.borrow_mut();
        inner.overrides.remove(name);
        inner
            .versions
            .remove(name)
            .map(|versions| versions.into_iter().map(|(version, _)| version).collect())
            .ok_or_else(|| Self::not_found(name))
    }
}
