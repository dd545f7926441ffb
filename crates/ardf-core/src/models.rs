//! Core data models used throughout ARDF Manager.
//!
//! These types represent the catalog entries and remote sources that flow
//! through the sync pipeline and the ranking engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::StoreError;

/// Version assigned when neither the caller nor the remote descriptor provides one.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Kind of catalog entry.
///
/// The set is open: unknown values round-trip through [`ResourceType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceType {
    Tool,
    Prompt,
    Workflow,
    Document,
    Policy,
    Model,
    Other(String),
}

impl ResourceType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Tool => "tool",
            Self::Prompt => "prompt",
            Self::Workflow => "workflow",
            Self::Document => "document",
            Self::Policy => "policy",
            Self::Model => "model",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for ResourceType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "tool" => Self::Tool,
            "prompt" => Self::Prompt,
            "workflow" => Self::Workflow,
            "document" => Self::Document,
            "policy" => Self::Policy,
            "model" => Self::Model,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for ResourceType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ResourceType> for String {
    fn from(value: ResourceType) -> Self {
        match value {
            ResourceType::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Publication state of a catalog entry.
///
/// Locally authored resources start as [`ResourceStatus::Draft`]; synced
/// resources default to [`ResourceStatus::Published`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceStatus {
    Draft,
    Published,
    Deprecated,
    Archived,
    Other(String),
}

impl ResourceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Deprecated => "deprecated",
            Self::Archived => "archived",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for ResourceStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "draft" => Self::Draft,
            "published" => Self::Published,
            "deprecated" => Self::Deprecated,
            "archived" => Self::Archived,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for ResourceStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ResourceStatus> for String {
    fn from(value: ResourceStatus) -> Self {
        match value {
            ResourceStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A catalog entry as stored and returned by a [`ResourceStore`](crate::store::ResourceStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub description: String,
    pub when_to_use: Option<String>,
    pub metadata: Option<Map<String, Value>>,
    pub content: Option<Map<String, Value>>,
    pub tags: Vec<String>,
    pub domain: Option<String>,
    pub status: ResourceStatus,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    /// Build the stored form of `input`, stamped with `created_at` / `updated_at`.
    ///
    /// `input` is expected to be normalized already (see [`ResourceInput::normalize`]).
    pub fn from_input(
        input: ResourceInput,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            resource_id: input.resource_id,
            resource_type: input.resource_type,
            description: input.description,
            when_to_use: input.when_to_use,
            metadata: input.metadata,
            content: input.content,
            tags: input.tags,
            domain: input.domain,
            status: input.status.unwrap_or(ResourceStatus::Draft),
            version: input.version.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            created_at,
            updated_at,
        }
    }

    /// The tag list as matched by free-text catalog queries (a JSON array).
    pub fn tags_text(&self) -> String {
        serialize_tags(&self.tags)
    }
}

/// Write shape for [`ResourceStore::upsert_resource`](crate::store::ResourceStore::upsert_resource).
///
/// Keyed by `resource_id`. Every mutable field is replaced on upsert;
/// omitted optional fields are stored as absent, not merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceInput {
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub description: String,
    #[serde(default)]
    pub when_to_use: Option<String>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub content: Option<Map<String, Value>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub domain: Option<String>,
    /// Defaults to `draft` when absent.
    #[serde(default)]
    pub status: Option<ResourceStatus>,
    /// Defaults to [`DEFAULT_VERSION`] when absent.
    #[serde(default)]
    pub version: Option<String>,
}

impl ResourceInput {
    pub fn new(
        resource_id: impl Into<String>,
        resource_type: impl Into<ResourceType>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            resource_type: resource_type.into(),
            description: description.into(),
            when_to_use: None,
            metadata: None,
            content: None,
            tags: Vec::new(),
            domain: None,
            status: None,
            version: None,
        }
    }

    /// Check required fields and canonicalize the rest.
    ///
    /// Tags are trimmed and de-duplicated, empty `metadata` / `content`
    /// objects become `None`.
    pub fn normalize(mut self) -> Result<Self, StoreError> {
        self.resource_id = self.resource_id.trim().to_string();
        if self.resource_id.is_empty() {
            return Err(StoreError::invalid("resource_id must not be empty"));
        }
        if self.resource_type.as_str().trim().is_empty() {
            return Err(StoreError::invalid(format!(
                "resource_type must not be empty ({})",
                self.resource_id
            )));
        }
        if self.description.trim().is_empty() {
            return Err(StoreError::invalid(format!(
                "description must not be empty ({})",
                self.resource_id
            )));
        }
        self.tags = normalize_tags(&self.tags);
        self.metadata = self.metadata.filter(|m| !m.is_empty());
        self.content = self.content.filter(|c| !c.is_empty());
        Ok(self)
    }
}

/// A remote catalog origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub base_url: String,
    pub label: String,
    pub last_sync_at: Option<DateTime<Utc>>,
}

/// Trim tags, drop empties and duplicates. First occurrence wins.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Serialize a tag list the way it is persisted and queried.
pub fn serialize_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_type_roundtrips_unknown_values() {
        assert_eq!(ResourceType::from("tool"), ResourceType::Tool);
        let custom = ResourceType::from("dataset");
        assert_eq!(custom, ResourceType::Other("dataset".to_string()));
        assert_eq!(String::from(custom), "dataset");
    }

    #[test]
    fn test_status_serializes_as_plain_string() {
        let v = serde_json::to_value(ResourceStatus::Published).unwrap();
        assert_eq!(v, json!("published"));
        let s: ResourceStatus = serde_json::from_value(json!("retired")).unwrap();
        assert_eq!(s, ResourceStatus::Other("retired".to_string()));
    }

    #[test]
    fn test_normalize_tags_trims_and_dedups() {
        let tags = normalize_tags(&[" travel", "booking ", "", "travel", "  "]);
        assert_eq!(tags, vec!["travel", "booking"]);
    }

    #[test]
    fn test_normalize_rejects_blank_id() {
        let err = ResourceInput::new("  ", "tool", "desc").normalize().unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn test_normalize_rejects_blank_description() {
        let err = ResourceInput::new("a", "tool", " ").normalize().unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[test]
    fn test_normalize_drops_empty_objects() {
        let mut input = ResourceInput::new("a", "tool", "desc");
        input.metadata = Some(Map::new());
        input.content = Some(json!({"endpoint": "x"}).as_object().unwrap().clone());
        let input = input.normalize().unwrap();
        assert!(input.metadata.is_none());
        assert!(input.content.is_some());
    }

    #[test]
    fn test_from_input_applies_local_defaults() {
        let now = Utc::now();
        let input = ResourceInput::new("a", "prompt", "desc").normalize().unwrap();
        let resource = Resource::from_input(input, now, now);
        assert_eq!(resource.status, ResourceStatus::Draft);
        assert_eq!(resource.version, DEFAULT_VERSION);
    }

    #[test]
    fn test_input_deserializes_with_defaults() {
        let input: ResourceInput = serde_json::from_value(json!({
            "resource_id": "tool_a",
            "resource_type": "tool",
            "description": "Alpha"
        }))
        .unwrap();
        assert!(input.tags.is_empty());
        assert!(input.status.is_none());
    }
}
