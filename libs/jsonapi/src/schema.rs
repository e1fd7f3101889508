//! Static resource declarations.
//!
//! A [`SchemaDefinition`] is built once at startup and shared read-only
//! through a [`SchemaRegistry`]; request handling only ever borrows it.

use std::collections::HashMap;
use std::sync::Arc;

use jsonapi_query::ResourceCatalog;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Record;

const ID_PLACEHOLDER: &str = "{id}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Any,
}

/// Value constraints checked after the kind check succeeded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub one_of: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct AttributeDef {
    pub name: String,
    pub kind: AttributeKind,
    pub required: bool,
    pub nullable: bool,
    /// Served in responses, ignored in payloads
    pub dump_only: bool,
    pub constraints: Constraints,
}

impl AttributeDef {
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            nullable: false,
            dump_only: false,
            constraints: Constraints::default(),
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Integer)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn dump_only(mut self) -> Self {
        self.dump_only = true;
        self
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.constraints.min = min;
        self.constraints.max = max;
        self
    }

    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.constraints.min_length = min;
        self.constraints.max_length = max;
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.constraints.one_of = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    ToOne,
    ToMany,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct RelationshipDef {
    pub name: String,
    pub related_type: String,
    /// Identifier field of the related resource
    pub related_id_field: String,
    pub cardinality: Cardinality,
    /// Template for `links.self`, `{id}` is the owner identifier
    pub self_url: Option<String>,
    /// Template for `links.related`, `{id}` is the owner identifier
    pub related_url: Option<String>,
    /// Emit `data` linkage even when the relationship is not included
    pub include_linkage: bool,
}

impl RelationshipDef {
    fn new(name: impl Into<String>, related_type: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            name: name.into(),
            related_type: related_type.into(),
            related_id_field: "id".to_owned(),
            cardinality,
            self_url: None,
            related_url: None,
            include_linkage: false,
        }
    }

    pub fn to_one(name: impl Into<String>, related_type: impl Into<String>) -> Self {
        Self::new(name, related_type, Cardinality::ToOne)
    }

    pub fn to_many(name: impl Into<String>, related_type: impl Into<String>) -> Self {
        Self::new(name, related_type, Cardinality::ToMany)
    }

    pub fn with_related_id_field(mut self, field: impl Into<String>) -> Self {
        self.related_id_field = field.into();
        self
    }

    pub fn with_self_url(mut self, template: impl Into<String>) -> Self {
        self.self_url = Some(template.into());
        self
    }

    pub fn with_related_url(mut self, template: impl Into<String>) -> Self {
        self.related_url = Some(template.into());
        self
    }

    pub fn with_linkage(mut self) -> Self {
        self.include_linkage = true;
        self
    }

    #[must_use]
    pub fn is_to_many(&self) -> bool {
        self.cardinality == Cardinality::ToMany
    }

    #[must_use]
    pub fn self_link(&self, owner_id: &str) -> Option<String> {
        self.self_url.as_deref().map(|t| t.replace(ID_PLACEHOLDER, owner_id))
    }

    #[must_use]
    pub fn related_link(&self, owner_id: &str) -> Option<String> {
        self.related_url
            .as_deref()
            .map(|t| t.replace(ID_PLACEHOLDER, owner_id))
    }
}

#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct SchemaDefinition {
    pub type_name: String,
    pub id_field: String,
    pub attributes: Vec<AttributeDef>,
    pub relationships: Vec<RelationshipDef>,
    /// Template for a resource's `links.self`, `{id}` is the identifier
    pub self_url: Option<String>,
}

impl SchemaDefinition {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id_field: "id".to_owned(),
            attributes: Vec::new(),
            relationships: Vec::new(),
            self_url: None,
        }
    }

    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    pub fn attribute(mut self, attribute: AttributeDef) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn relationship(mut self, relationship: RelationshipDef) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn with_self_url(mut self, template: impl Into<String>) -> Self {
        self.self_url = Some(template.into());
        self
    }

    #[must_use]
    pub fn attribute_def(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    #[must_use]
    pub fn relationship_def(&self, name: &str) -> Option<&RelationshipDef> {
        self.relationships.iter().find(|r| r.name == name)
    }

    #[must_use]
    pub fn self_link(&self, id: &str) -> Option<String> {
        self.self_url.as_deref().map(|t| t.replace(ID_PLACEHOLDER, id))
    }

    /// Identifier of a stored record, rendered as a string
    #[must_use]
    pub fn id_of(&self, record: &Record) -> Option<String> {
        id_value(record.get(&self.id_field)?)
    }
}

/// Strings are taken as is, numbers are rendered; anything else has no id.
#[must_use]
pub fn id_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("resource type \"{0}\" is already registered")]
    DuplicateType(String),

    #[error("relationship \"{relationship}\" of \"{resource_type}\" targets unregistered type \"{related_type}\"")]
    UnknownRelatedType {
        resource_type: String,
        relationship: String,
        related_type: String,
    },

    #[error("resource type \"{0}\" is not registered")]
    UnknownType(String),
}

/// Process-wide set of resource declarations keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<SchemaDefinition>>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Returns `SchemaError::DuplicateType` if the type name is taken.
    pub fn register(&mut self, definition: SchemaDefinition) -> Result<(), SchemaError> {
        if self.schemas.contains_key(&definition.type_name) {
            return Err(SchemaError::DuplicateType(definition.type_name));
        }
        self.schemas
            .insert(definition.type_name.clone(), Arc::new(definition));
        Ok(())
    }

    /// Check that every relationship targets a registered type.
    ///
    /// # Errors
    /// Returns `SchemaError::UnknownRelatedType` for the first dangling relationship.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for schema in self.schemas.values() {
            for rel in &schema.relationships {
                if !self.schemas.contains_key(&rel.related_type) {
                    return Err(SchemaError::UnknownRelatedType {
                        resource_type: schema.type_name.clone(),
                        relationship: rel.name.clone(),
                        related_type: rel.related_type.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, resource_type: &str) -> Option<&SchemaDefinition> {
        self.schemas.get(resource_type).map(AsRef::as_ref)
    }

    /// # Errors
    /// Returns `SchemaError::UnknownType` if nothing is registered under the name.
    pub fn require(&self, resource_type: &str) -> Result<&SchemaDefinition, SchemaError> {
        self.get(resource_type)
            .ok_or_else(|| SchemaError::UnknownType(resource_type.to_owned()))
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}

impl ResourceCatalog for SchemaRegistry {
    fn contains_type(&self, resource_type: &str) -> bool {
        self.schemas.contains_key(resource_type)
    }

    fn has_field(&self, resource_type: &str, field: &str) -> bool {
        self.get(resource_type).is_some_and(|s| {
            s.attribute_def(field).is_some() || s.relationship_def(field).is_some()
        })
    }

    fn has_attribute(&self, resource_type: &str, attribute: &str) -> bool {
        self.get(resource_type)
            .is_some_and(|s| s.id_field == attribute || s.attribute_def(attribute).is_some())
    }

    fn related_type(&self, resource_type: &str, relationship: &str) -> Option<&str> {
        self.get(resource_type)?
            .relationship_def(relationship)
            .map(|r| r.related_type.as_str())
    }
}
