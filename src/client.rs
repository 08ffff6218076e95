//! Blocking HTTP client for Confluent-compatible schema registries
//!
//! ## Endpoints
//!
//! | call | request |
//! |---|---|
//! | subjects | `GET /subjects` |
//! | test_compatibility | `POST /compatibility/subjects/{s}/versions/latest?verbose=true` |
//! | global_compatibility, normalize | `GET /config` |
//! | subject_compatibility | `GET /config/{s}?defaultToGlobal=true` |
//! | latest_schema | `GET /subjects/{s}/versions/latest` |
//! | version | `POST /subjects/{s}` |
//! | update_global_compatibility, update_normalize | `PUT /config` |
//! | update_subject_compatibility | `PUT /config/{s}` |
//! | register | `POST /subjects/{s}/versions` |
//! | delete_subject | `DELETE /subjects/{s}` |
//!
//! Requests are sent once; there are no retries.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use ureq::http::{Response, StatusCode};
use ureq::Body;

use crate::compatibility::Compatibility;
use crate::config::RegistryConfig;
use crate::error::{GitopsError, Result};
use crate::registry::{RegistryAdmin, RegistryClient};
use crate::schema::{SchemaDefinition, SchemaReference, SchemaType};
use crate::state::Subject;

const CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";

/// Registry client over the REST API
pub struct HttpRegistryClient {
    base_url: String,
    agent: ureq::Agent,
    authorization: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SchemaRequest<'a> {
    schema: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema_type: Option<SchemaType>,
    references: &'a [SchemaReference],
}

impl<'a> SchemaRequest<'a> {
    fn new(schema: &'a SchemaDefinition) -> Self {
        let schema_type = schema.schema_type();
        Self {
            schema: schema.raw(),
            // the registry assumes AVRO when the type is missing
            schema_type: (schema_type != SchemaType::Avro).then_some(schema_type),
            references: schema.references(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaResponse {
    schema: String,
    #[serde(default)]
    schema_type: Option<SchemaType>,
    #[serde(default)]
    references: Vec<SchemaReference>,
    #[serde(default)]
    version: Option<u32>,
}

#[derive(Deserialize)]
struct CompatibilityCheck {
    is_compatible: bool,
    #[serde(default)]
    messages: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigResponse {
    compatibility_level: Compatibility,
    #[serde(default)]
    normalize: Option<bool>,
}

#[derive(Serialize, Default)]
struct ConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    compatibility: Option<Compatibility>,
    #[serde(skip_serializing_if = "Option::is_none")]
    normalize: Option<bool>,
}

#[derive(Deserialize)]
struct RegisterResponse {
    id: u32,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error_code: Option<u32>,
    message: String,
}

impl HttpRegistryClient {
    pub fn new(config: &RegistryConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        let authorization = config.username.as_ref().map(|user| {
            let password = config.password.as_deref().unwrap_or_default();
            format!("Basic {}", BASE64.encode(format!("{user}:{password}")))
        });

        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            agent,
            authorization,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> Result<Response<Body>> {
        debug!(method = "GET", path, "registry request");
        let mut request = self.agent.get(self.url(path)).header("Accept", CONTENT_TYPE);
        if let Some(auth) = &self.authorization {
            request = request.header("Authorization", auth);
        }
        Ok(request.call()?)
    }

    fn delete(&self, path: &str) -> Result<Response<Body>> {
        debug!(method = "DELETE", path, "registry request");
        let mut request = self.agent.delete(self.url(path)).header("Accept", CONTENT_TYPE);
        if let Some(auth) = &self.authorization {
            request = request.header("Authorization", auth);
        }
        Ok(request.call()?)
    }

    fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Response<Body>> {
        debug!(method = "POST", path, "registry request");
        let mut request = self
            .agent
            .post(self.url(path))
            .header("Accept", CONTENT_TYPE)
            .header("Content-Type", CONTENT_TYPE);
        if let Some(auth) = &self.authorization {
            request = request.header("Authorization", auth);
        }
        Ok(request.send(serde_json::to_vec(body)?)?)
    }

    fn put<B: Serialize>(&self, path: &str, body: &B) -> Result<Response<Body>> {
        debug!(method = "PUT", path, "registry request");
        let mut request = self
            .agent
            .put(self.url(path))
            .header("Accept", CONTENT_TYPE)
            .header("Content-Type", CONTENT_TYPE);
        if let Some(auth) = &self.authorization {
            request = request.header("Authorization", auth);
        }
        Ok(request.send(serde_json::to_vec(body)?)?)
    }
}

/// Decode a successful response or turn the registry's error body into an error
fn read_json<T: DeserializeOwned>(mut response: Response<Body>) -> Result<T> {
    let status = response.status();
    let text = response.body_mut().read_to_string()?;

    if status.is_success() {
        return Ok(serde_json::from_str(&text)?);
    }

    let message = match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(ErrorResponse {
            error_code: Some(code),
            message,
        }) => format!("{message} (error code {code})"),
        Ok(ErrorResponse { message, .. }) => message,
        Err(_) if text.is_empty() => status.canonical_reason().unwrap_or("unknown error").to_string(),
        Err(_) => text,
    };

    Err(GitopsError::Registry {
        status: status.as_u16(),
        message,
    })
}

/// Messages from a compatibility check; empty means compatible
fn compatibility_messages(subject: &str, response: Response<Body>) -> Result<Vec<String>> {
    // nothing registered yet, so nothing to be incompatible with
    if response.status() == StatusCode::NOT_FOUND {
        return Ok(Vec::new());
    }

    let check: CompatibilityCheck = read_json(response)?;
    match (check.is_compatible, check.messages.is_empty()) {
        (true, _) => Ok(Vec::new()),
        (false, false) => Ok(check.messages),
        (false, true) => Ok(vec![format!("schema for '{subject}' is incompatible")]),
    }
}

/// Version a schema lookup found, `None` when the subject or schema is unknown
fn registered_version(response: Response<Body>) -> Result<Option<u32>> {
    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    let found: SchemaResponse = read_json(response)?;
    Ok(found.version)
}

/// Percent-encode a subject name for use as a path segment
fn encode_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

impl RegistryClient for HttpRegistryClient {
    type Error = GitopsError;

    fn subjects(&self) -> Result<Vec<String>> {
        read_json(self.get("/subjects")?)
    }

    fn test_compatibility(&self, subject: &Subject) -> Result<Vec<String>> {
        let path = format!(
            "/compatibility/subjects/{}/versions/latest?verbose=true",
            encode_segment(&subject.name)
        );
        compatibility_messages(&subject.name, self.post(&path, &SchemaRequest::new(&subject.schema))?)
    }

    fn global_compatibility(&self) -> Result<Compatibility> {
        let config: ConfigResponse = read_json(self.get("/config")?)?;
        Ok(config.compatibility_level)
    }

    fn normalize(&self) -> Result<bool> {
        let config: ConfigResponse = read_json(self.get("/config")?)?;
        Ok(config.normalize.unwrap_or(false))
    }

    fn subject_compatibility(&self, name: &str) -> Result<Compatibility> {
        let path = format!("/config/{}?defaultToGlobal=true", encode_segment(name));
        let config: ConfigResponse = read_json(self.get(&path)?)?;
        Ok(config.compatibility_level)
    }

    fn latest_schema(&self, name: &str) -> Result<SchemaDefinition> {
        let path = format!("/subjects/{}/versions/latest", encode_segment(name));
        let latest: SchemaResponse = read_json(self.get(&path)?)?;

        SchemaDefinition::parse(
            name,
            latest.schema_type.unwrap_or_default(),
            latest.schema,
            latest.references,
        )
    }

    fn version(&self, subject: &Subject) -> Result<Option<u32>> {
        let path = format!("/subjects/{}", encode_segment(&subject.name));
        registered_version(self.post(&path, &SchemaRequest::new(&subject.schema))?)
    }
}

impl RegistryAdmin for HttpRegistryClient {
    type Error = GitopsError;

    fn update_global_compatibility(&self, level: Compatibility) -> Result<()> {
        let update = ConfigUpdate {
            compatibility: Some(level),
            ..ConfigUpdate::default()
        };
        read_json::<serde_json::Value>(self.put("/config", &update)?)?;
        Ok(())
    }

    fn update_normalize(&self, normalize: bool) -> Result<()> {
        let update = ConfigUpdate {
            normalize: Some(normalize),
            ..ConfigUpdate::default()
        };
        read_json::<serde_json::Value>(self.put("/config", &update)?)?;
        Ok(())
    }

    fn update_subject_compatibility(&self, name: &str, level: Compatibility) -> Result<()> {
        let update = ConfigUpdate {
            compatibility: Some(level),
            ..ConfigUpdate::default()
        };
        let path = format!("/config/{}", encode_segment(name));
        read_json::<serde_json::Value>(self.put(&path, &update)?)?;
        Ok(())
    }

    fn register(&self, subject: &Subject, normalize: bool) -> Result<u32> {
        let path = format!("/subjects/{}/versions?normalize={}", encode_segment(&subject.name), normalize);
        let registered: RegisterResponse = read_json(self.post(&path, &SchemaRequest::new(&subject.schema))?)?;
        Ok(registered.id)
    }

    fn delete_subject(&self, name: &str) -> Result<Vec<u32>> {
        let path = format!("/subjects/{}", encode_segment(name));
        read_json(self.delete(&path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("orders-value"), "orders-value");
        assert_eq!(encode_segment("ns:orders/v1"), "ns%3Aorders%2Fv1");
    }

    #[test]
    fn test_avro_requests_omit_schema_type() {
        let schema =
            SchemaDefinition::parse("s", SchemaType::Avro, r#"{"type": "string"}"#, vec![]).unwrap();
        let body = serde_json::to_value(SchemaRequest::new(&schema)).unwrap();
        assert_eq!(body, serde_json::json!({"schema": r#"{"type": "string"}"#, "references": []}));
    }

    #[test]
    fn test_protobuf_requests_carry_schema_type() {
        let schema = SchemaDefinition::parse(
            "s",
            SchemaType::Protobuf,
            "syntax = \"proto3\"; message A {}",
            vec![],
        )
        .unwrap();
        let body = serde_json::to_value(SchemaRequest::new(&schema)).unwrap();
        assert_eq!(body["schemaType"], "PROTOBUF");
    }

    #[test]
    fn test_config_response_without_normalize() {
        let config: ConfigResponse =
            serde_json::from_str(r#"{"compatibilityLevel": "FULL_TRANSITIVE"}"#).unwrap();
        assert_eq!(config.compatibility_level, Compatibility::FullTransitive);
        assert_eq!(config.normalize, None);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = RegistryConfig {
            url: "http://localhost:8081/".to_string(),
            ..RegistryConfig::default()
        };
        let client = HttpRegistryClient::new(&config);
        assert_eq!(client.base_url(), "http://localhost:8081");
    }

    fn response(status: u16, body: &str) -> Response<Body> {
        Response::builder()
            .status(status)
            .body(Body::builder().data(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_unknown_subject_is_compatible() {
        let not_found = response(404, r#"{"error_code": 40401, "message": "Subject 'orders' not found."}"#);
        assert!(compatibility_messages("orders", not_found).unwrap().is_empty());
    }

    #[test]
    fn test_compatibility_messages() {
        let ok = response(200, r#"{"is_compatible": true}"#);
        assert!(compatibility_messages("orders", ok).unwrap().is_empty());

        let rejected = response(200, r#"{"is_compatible": false, "messages": ["reader field missing default"]}"#);
        assert_eq!(
            compatibility_messages("orders", rejected).unwrap(),
            vec!["reader field missing default".to_string()]
        );
    }

    #[test]
    fn test_incompatible_without_messages_gets_one() {
        let rejected = response(200, r#"{"is_compatible": false, "messages": []}"#);
        let messages = compatibility_messages("orders", rejected).unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("orders"));
    }

    #[test]
    fn test_compatibility_server_error() {
        let failed = response(500, r#"{"error_code": 50001, "message": "Error in the backend data store"}"#);
        let err = compatibility_messages("orders", failed).unwrap_err();
        assert!(matches!(err, GitopsError::Registry { status: 500, .. }));
    }

    #[test]
    fn test_registered_version() {
        let found = response(200, r#"{"subject": "orders", "id": 7, "version": 3, "schema": "\"string\""}"#);
        assert_eq!(registered_version(found).unwrap(), Some(3));

        let missing = response(404, r#"{"error_code": 40403, "message": "Schema not found"}"#);
        assert_eq!(registered_version(missing).unwrap(), None);
    }

    #[test]
    fn test_error_body_becomes_registry_error() {
        let invalid = response(422, r#"{"error_code": 42201, "message": "Invalid schema"}"#);
        let err = read_json::<serde_json::Value>(invalid).unwrap_err();
        match err {
            GitopsError::Registry { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "Invalid schema (error code 42201)");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_plain_error_body_is_kept() {
        let err = read_json::<serde_json::Value>(response(401, "Unauthorized")).unwrap_err();
        assert!(matches!(err, GitopsError::Registry { status: 401, message } if message == "Unauthorized"));

        let err = read_json::<serde_json::Value>(response(503, "")).unwrap_err();
        assert!(matches!(err, GitopsError::Registry { status: 503, message } if message == "Service Unavailable"));
    }
}
