//! Site content collections.
//!
//! Every content type is a collection of JSON documents. Field values are
//! free-form (bilingual fields are usually `{"en": .., "ur": ..}` objects);
//! only the required top-level fields of each resource are checked.

pub mod connector;
pub mod memory;
pub mod queries;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::pool::PoolError;

/// Content errors.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Content types managed through the admin API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Blogs,
    Contact,
    Events,
    Gallery,
    Hero,
    Impact,
    Navbar,
    Partners,
    Programs,
    Services,
    Testimonials,
}

impl Resource {
    pub const ALL: [Resource; 11] = [
        Resource::Blogs,
        Resource::Contact,
        Resource::Events,
        Resource::Gallery,
        Resource::Hero,
        Resource::Impact,
        Resource::Navbar,
        Resource::Partners,
        Resource::Programs,
        Resource::Services,
        Resource::Testimonials,
    ];

    /// URL segment and collection name.
    pub fn slug(&self) -> &'static str {
        match self {
            Resource::Blogs => "blogs",
            Resource::Contact => "contact",
            Resource::Events => "events",
            Resource::Gallery => "gallery",
            Resource::Hero => "hero",
            Resource::Impact => "impact",
            Resource::Navbar => "navbar",
            Resource::Partners => "partners",
            Resource::Programs => "programs",
            Resource::Services => "services",
            Resource::Testimonials => "testimonials",
        }
    }

    /// Singular, human-readable name used in messages.
    pub fn label(&self) -> &'static str {
        match self {
            Resource::Blogs => "Blog post",
            Resource::Contact => "Contact info",
            Resource::Events => "Event",
            Resource::Gallery => "Gallery item",
            Resource::Hero => "Hero section",
            Resource::Impact => "Impact stat",
            Resource::Navbar => "Navbar item",
            Resource::Partners => "Partner",
            Resource::Programs => "Program",
            Resource::Services => "Service",
            Resource::Testimonials => "Testimonial",
        }
    }

    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Resource::Blogs => &["title", "content"],
            Resource::Contact => &["email", "phone"],
            Resource::Events => &["title", "date"],
            Resource::Gallery => &["title", "image"],
            Resource::Hero => &["title"],
            Resource::Impact => &["label", "value"],
            Resource::Navbar => &["label", "href"],
            Resource::Partners => &["name"],
            Resource::Programs => &["title", "description"],
            Resource::Services => &["title", "description"],
            Resource::Testimonials => &["name", "message"],
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Resource {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.slug() == s)
            .ok_or_else(|| ContentError::UnknownResource(s.to_string()))
    }
}

/// A stored content document. Serializes flat: `{id, ..fields, createdAt, updatedAt}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filters for list queries (`?limit=&showOnHome=&homepage=&category=&status=`).
///
/// `homepage` is an alias for `showOnHome`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentQuery {
    pub limit: Option<usize>,
    pub show_on_home: Option<bool>,
    pub homepage: Option<bool>,
    pub category: Option<String>,
    pub status: Option<String>,
}

impl ContentQuery {
    pub fn home_filter(&self) -> Option<bool> {
        self.show_on_home.or(self.homepage)
    }

    /// Whether a document's fields pass every filter (limit excluded).
    pub fn matches(&self, data: &Map<String, Value>) -> bool {
        if let Some(home) = self.home_filter()
            && data.get("showOnHome").and_then(Value::as_bool).unwrap_or(false) != home
        {
            return false;
        }
        if let Some(ref category) = self.category
            && data.get("category").and_then(Value::as_str) != Some(category.as_str())
        {
            return false;
        }
        if let Some(ref status) = self.status
            && data.get("status").and_then(Value::as_str) != Some(status.as_str())
        {
            return false;
        }
        true
    }
}

/// Keys owned by the store; clients cannot set them.
const RESERVED_KEYS: [&str; 4] = ["id", "_id", "createdAt", "updatedAt"];

fn into_object(body: Value) -> Result<Map<String, Value>, ContentError> {
    match body {
        Value::Object(mut map) => {
            for key in RESERVED_KEYS {
                map.remove(key);
            }
            Ok(map)
        }
        _ => Err(ContentError::Validation("Request body must be a JSON object".into())),
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Object(m)) => m.is_empty(),
        _ => false,
    }
}

/// Validate a create body and strip reserved keys.
pub fn prepare_insert(resource: Resource, body: Value) -> Result<Map<String, Value>, ContentError> {
    let data = into_object(body)?;
    if let Some(missing) = resource
        .required_fields()
        .iter()
        .find(|f| is_blank(data.get(**f)))
    {
        return Err(ContentError::Validation(format!(
            "Missing required field: {missing}"
        )));
    }
    Ok(data)
}

/// Validate an update body and strip reserved keys.
pub fn prepare_update(resource: Resource, body: Value) -> Result<Map<String, Value>, ContentError> {
    let patch = into_object(body)?;
    if patch.is_empty() {
        return Err(ContentError::Validation("No fields to update".into()));
    }
    if let Some(cleared) = resource
        .required_fields()
        .iter()
        .find(|f| patch.contains_key(**f) && is_blank(patch.get(**f)))
    {
        return Err(ContentError::Validation(format!(
            "Field {cleared} cannot be empty"
        )));
    }
    Ok(patch)
}

/// Document storage for all content collections.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Newest first, filtered and limited by `query`.
    async fn list(&self, resource: Resource, query: &ContentQuery)
    -> Result<Vec<Document>, ContentError>;

    async fn get(&self, resource: Resource, id: &str) -> Result<Option<Document>, ContentError>;

    async fn insert(
        &self,
        resource: Resource,
        data: Map<String, Value>,
    ) -> Result<Document, ContentError>;

    /// Shallow-merge `patch` into the document. `None` if absent.
    async fn update(
        &self,
        resource: Resource,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<Option<Document>, ContentError>;

    async fn delete(&self, resource: Resource, id: &str) -> Result<bool, ContentError>;

    /// Release underlying connections.
    async fn close(&self) -> Result<(), ContentError>;
}
