//! Schema definitions and lookup
//!
//! Schemas are provisioned out of band as JSON-Schema style documents:
//!
//! ```json
//! {
//!   "input": {
//!     "type": "object",
//!     "required": ["dimension_name", "dimension"],
//!     "properties": {
//!       "dimension_name": { "type": "string" },
//!       "dimension": {
//!         "type": "array",
//!         "items": {
//!           "type": "object",
//!           "required": ["school_id", "school_name"],
//!           "properties": { "school_id": { "type": "string" } }
//!         }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Only the structural subset is compiled: required field names, array and
//! object shapes, and `minItems`. Scalar types are not enforced.

use async_trait::async_trait;
use dashmap::DashMap;
use intake_common::RecordKind;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::{IngestError, IngestResult, PersistenceError};

/// Structural shape of a declared field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldShape {
    /// Any non-null value
    Scalar,
    Array {
        items: Option<Box<FieldShape>>,
        min_items: usize,
    },
    Object(RecordShape),
}

/// Required fields and declared property shapes of one object
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordShape {
    pub required: Vec<String>,
    pub properties: BTreeMap<String, FieldShape>,
}

impl RecordShape {
    fn from_node(node: &Value) -> Self {
        let required = node
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let properties = node
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, prop)| (name.clone(), FieldShape::from_node(prop)))
                    .collect()
            })
            .unwrap_or_default();

        Self { required, properties }
    }
}

impl FieldShape {
    fn from_node(node: &Value) -> Self {
        match node.get("type").and_then(Value::as_str) {
            Some("array") => FieldShape::Array {
                items: node
                    .get("items")
                    .map(|items| Box::new(FieldShape::from_node(items))),
                min_items: node
                    .get("minItems")
                    .and_then(Value::as_u64)
                    .unwrap_or(0) as usize,
            },
            Some("object") => FieldShape::Object(RecordShape::from_node(node)),
            None if node.get("properties").is_some() => {
                FieldShape::Object(RecordShape::from_node(node))
            },
            _ => FieldShape::Scalar,
        }
    }
}

/// A compiled schema for one `(kind, name)` pair. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDefinition {
    pub kind: RecordKind,
    pub name: String,
    /// Required top-level envelope fields, in declaration order
    pub required_fields: Vec<String>,
    /// Shape every element of the record array must satisfy
    pub record_shape: RecordShape,
}

impl SchemaDefinition {
    /// Compile a stored document.
    ///
    /// Returns `None` for a null or empty document, or one without an `input`
    /// object; callers treat that the same as a missing schema.
    pub fn from_document(kind: RecordKind, name: &str, document: &Value) -> Option<Self> {
        let input = document
            .get("input")
            .filter(|input| input.as_object().is_some_and(|fields| !fields.is_empty()))?;
        let envelope = RecordShape::from_node(input);

        let record_shape = match envelope.properties.get(kind.records_field()) {
            Some(FieldShape::Array { items: Some(items), .. }) => match items.as_ref() {
                FieldShape::Object(shape) => shape.clone(),
                _ => RecordShape::default(),
            },
            _ => RecordShape::default(),
        };

        Some(Self {
            kind,
            name: name.to_string(),
            required_fields: envelope.required,
            record_shape,
        })
    }
}

/// Read-only source of stored schema documents
#[async_trait]
pub trait SchemaStore: Send + Sync {
    async fn fetch(
        &self,
        kind: RecordKind,
        name: &str,
    ) -> Result<Option<Value>, PersistenceError>;
}

/// Resolves `(kind, name)` to a compiled schema
#[derive(Clone)]
pub struct SchemaRegistry {
    store: Arc<dyn SchemaStore>,
}

impl SchemaRegistry {
    pub fn new(store: Arc<dyn SchemaStore>) -> Self {
        Self { store }
    }

    /// Look up the schema for `kind` named `name`.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest("<Kind> name is missing")` for an absent or empty name
    /// - `NotFound("No <kind> found")` when nothing usable is stored
    /// - `Persistence` when the store itself fails
    #[tracing::instrument(skip(self), fields(kind = %kind))]
    pub async fn resolve(
        &self,
        kind: RecordKind,
        name: Option<&str>,
    ) -> IngestResult<SchemaDefinition> {
        let name = name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| IngestError::InvalidRequest(format!("{} name is missing", kind.title())))?;

        let document = self.store.fetch(kind, name).await?;

        document
            .as_ref()
            .and_then(|doc| SchemaDefinition::from_document(kind, name, doc))
            .ok_or_else(|| {
                tracing::debug!(schema = name, "No schema registered");
                IngestError::NotFound(format!("No {} found", kind.as_str()))
            })
    }
}

/// In-process schema store
#[derive(Debug, Default)]
pub struct MemorySchemaStore {
    documents: DashMap<(RecordKind, String), Value>,
}

impl MemorySchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, kind: RecordKind, name: impl Into<String>, document: Value) {
        self.documents.insert((kind, name.into()), document);
    }

    pub fn with_schema(self, kind: RecordKind, name: impl Into<String>, document: Value) -> Self {
        self.insert(kind, name, document);
        self
    }
}

#[async_trait]
impl SchemaStore for MemorySchemaStore {
    async fn fetch(
        &self,
        kind: RecordKind,
        name: &str,
    ) -> Result<Option<Value>, PersistenceError> {
        Ok(self
            .documents
            .get(&(kind, name.to_string()))
            .map(|doc| doc.value().clone()))
    }
}
