//! Remote catalog items and their normalization into [`ResourceInput`].
//!
//! A remote catalog exposes three collections (`tools`, `prompts`,
//! `resources`) whose items only loosely follow one shape. Each raw JSON
//! item is validated once, at ingestion, into a [`ResourceDescriptor`];
//! everything downstream of that point works with typed fields.

use serde_json::{Map, Value};

use crate::error::DescriptorError;
use crate::models::{normalize_tags, ResourceInput, ResourceStatus, ResourceType, DEFAULT_VERSION};

/// Description used when an item carries no description, title or name.
pub const PLACEHOLDER_DESCRIPTION: &str = "No description provided";

/// One of the collections a remote catalog serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogCollection {
    Tools,
    Prompts,
    Resources,
}

impl CatalogCollection {
    /// All collections, in fetch order.
    pub const ALL: [CatalogCollection; 3] = [Self::Tools, Self::Prompts, Self::Resources];

    /// Collection name, used both as URL path segment and as wrapper key.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tools => "tools",
            Self::Prompts => "prompts",
            Self::Resources => "resources",
        }
    }

    /// Extract the item list from a collection response body.
    ///
    /// Accepts a bare array or an object carrying the array under the
    /// collection's name. Returns `None` for any other shape.
    pub fn items_from_body(&self, body: Value) -> Option<Vec<Value>> {
        match body {
            Value::Array(items) => Some(items),
            Value::Object(mut map) => match map.remove(self.name()) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            },
            _ => None,
        }
    }
}

/// A validated remote catalog item, normalized and ready to upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
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
}

impl ResourceDescriptor {
    /// Validate and normalize one raw item.
    ///
    /// Fails when the item is not an object or lacks a non-blank string
    /// `resource_id` / `resource_type`. Every other field has a fallback.
    pub fn from_value(value: &Value) -> Result<Self, DescriptorError> {
        let item = value.as_object().ok_or(DescriptorError::NotAnObject)?;

        let resource_id =
            non_blank(item, "resource_id").ok_or(DescriptorError::MissingField("resource_id"))?;
        let resource_type = non_blank(item, "resource_type")
            .ok_or(DescriptorError::MissingField("resource_type"))?;

        let metadata = item.get("metadata").and_then(Value::as_object);

        let description = non_blank(item, "description")
            .or_else(|| non_blank(item, "title"))
            .or_else(|| non_blank(item, "name"))
            .unwrap_or(PLACEHOLDER_DESCRIPTION)
            .to_string();

        let tags = metadata
            .and_then(|m| m.get("tags"))
            .and_then(tag_list)
            .or_else(|| item.get("tags").and_then(tag_list))
            .unwrap_or_default();

        let domain = metadata
            .and_then(|m| non_blank(m, "domain"))
            .map(str::to_string);

        let status = non_blank(item, "status")
            .map(ResourceStatus::from)
            .unwrap_or(ResourceStatus::Published);

        let version = non_blank(item, "version")
            .or_else(|| non_blank(item, "schema_version"))
            .or_else(|| metadata.and_then(|m| non_blank(m, "version")))
            .unwrap_or(DEFAULT_VERSION)
            .to_string();

        Ok(Self {
            resource_id: resource_id.trim().to_string(),
            resource_type: ResourceType::from(resource_type.trim()),
            description,
            when_to_use: non_blank(item, "when_to_use").map(str::to_string),
            metadata: metadata.filter(|m| !m.is_empty()).cloned(),
            content: item
                .get("content")
                .and_then(Value::as_object)
                .filter(|c| !c.is_empty())
                .cloned(),
            tags,
            domain,
            status,
            version,
        })
    }

    /// The upsert payload for this descriptor.
    pub fn into_input(self) -> ResourceInput {
        ResourceInput {
            resource_id: self.resource_id,
            resource_type: self.resource_type,
            description: self.description,
            when_to_use: self.when_to_use,
            metadata: self.metadata,
            content: self.content,
            tags: self.tags,
            domain: self.domain,
            status: Some(self.status),
            version: Some(self.version),
        }
    }
}

fn non_blank<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Tags from an array of strings or a comma-separated string.
///
/// `None` when the value has neither shape or yields no tags, so the
/// caller can fall through to the next source.
fn tag_list(value: &Value) -> Option<Vec<String>> {
    let tags = match value {
        Value::Array(items) => {
            let raw: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            normalize_tags(&raw)
        }
        Value::String(s) => {
            let raw: Vec<&str> = s.split(',').collect();
            normalize_tags(&raw)
        }
        _ => return None,
    };
    if tags.is_empty() {
        None
    } else {
        Some(tags)
    }
}
