//! Request-scoped schema variants.
//!
//! A [`DerivedSchema`] pairs a borrowed base definition with the sparse
//! fieldsets and include tree of one request. It serializes stored records
//! into resource objects (collecting `included`) and loads payloads back into
//! records (see [`crate::load`]). The base definition is never modified.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use jsonapi_errors::{ErrorKind, JsonApiError};
use jsonapi_query::QueryOptions;
use serde_json::{Map, Value, json};

use crate::document::{Document, Record};
use crate::error::ResourceError;
use crate::schema::{RelationshipDef, SchemaDefinition, SchemaRegistry, id_value};

/// Tree of relationship names built from dot-separated include paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeTree(BTreeMap<String, IncludeTree>);

impl IncludeTree {
    pub fn from_paths<'p>(paths: impl IntoIterator<Item = &'p str>) -> Self {
        let mut root = Self::default();
        for path in paths {
            let mut node = &mut root;
            for segment in path.split('.') {
                node = node.0.entry(segment.to_owned()).or_default();
            }
        }
        root
    }

    #[must_use]
    pub fn child(&self, relationship: &str) -> Option<&IncludeTree> {
        self.0.get(relationship)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaMode {
    /// Serialize a sequence of resources
    pub many: bool,
    /// Relax required attributes on load
    pub partial: bool,
}

impl SchemaMode {
    #[must_use]
    pub fn single() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn many() -> Self {
        Self {
            many: true,
            partial: false,
        }
    }

    #[must_use]
    pub fn partial() -> Self {
        Self {
            many: false,
            partial: true,
        }
    }
}

/// Primary data plus the compound-document `included` array.
#[derive(Debug, Clone, PartialEq)]
pub struct Serialized {
    pub data: Value,
    pub included: Vec<Value>,
}

impl Serialized {
    pub fn into_document(self) -> Document {
        Document::data(self.data).with_included(self.included)
    }
}

/// Resources reachable through the include tree, unique by `(type, id)`.
#[derive(Default)]
struct IncludedSet {
    seen: HashSet<(String, String)>,
    items: Vec<Value>,
}

enum RelatedEntry<'r> {
    Id(String),
    Record(&'r Record),
}

#[derive(Debug, Clone)]
pub struct DerivedSchema<'a> {
    registry: &'a SchemaRegistry,
    base: &'a SchemaDefinition,
    fields: BTreeMap<String, BTreeSet<String>>,
    include: IncludeTree,
    mode: SchemaMode,
}

impl<'a> DerivedSchema<'a> {
    /// Derive the variant of `resource_type` requested by `options`.
    ///
    /// # Errors
    /// - `InvalidInclude` if an include path does not walk declared relationships
    /// - `ResourceError::Unexpected` if the type itself is not registered
    pub fn derive(
        registry: &'a SchemaRegistry,
        resource_type: &str,
        options: &QueryOptions,
        mode: SchemaMode,
    ) -> Result<Self, ResourceError> {
        let base = registry.require(resource_type)?;

        for path in &options.include {
            let mut current = base;
            for segment in path.split('.') {
                let related = current
                    .relationship_def(segment)
                    .and_then(|rel| registry.get(&rel.related_type))
                    .ok_or_else(|| {
                        JsonApiError::from_message(
                            ErrorKind::InvalidInclude,
                            format!("\"{}\" has no relationship \"{segment}\"", current.type_name),
                        )
                    })?;
                current = related;
            }
        }

        Ok(Self {
            registry,
            base,
            fields: options.fields.clone(),
            include: IncludeTree::from_paths(options.include.iter().map(String::as_str)),
            mode,
        })
    }

    #[must_use]
    pub fn base(&self) -> &'a SchemaDefinition {
        self.base
    }

    #[must_use]
    pub fn registry(&self) -> &'a SchemaRegistry {
        self.registry
    }

    #[must_use]
    pub fn mode(&self) -> SchemaMode {
        self.mode
    }

    #[must_use]
    pub fn include_tree(&self) -> &IncludeTree {
        &self.include
    }

    /// Same fieldsets and includes under another mode
    #[must_use]
    pub fn with_mode(&self, mode: SchemaMode) -> Self {
        Self {
            mode,
            ..self.clone()
        }
    }

    fn selected(&self, resource_type: &str, field: &str) -> bool {
        self.fields
            .get(resource_type)
            .is_none_or(|set| set.contains(field))
    }

    /// Serialize primary data. In `many` mode every record becomes an element
    /// of the `data` array; otherwise the first record (or `null`) is used.
    #[must_use]
    pub fn serialize(&self, records: &[Record]) -> Serialized {
        let mut included = IncludedSet::default();
        for record in records {
            if let Some(id) = self.base.id_of(record) {
                included.seen.insert((self.base.type_name.clone(), id));
            }
        }

        let data = if self.mode.many {
            Value::Array(
                records
                    .iter()
                    .map(|record| self.resource_object(self.base, record, &self.include, &mut included))
                    .collect(),
            )
        } else {
            records.first().map_or(Value::Null, |record| {
                self.resource_object(self.base, record, &self.include, &mut included)
            })
        };

        Serialized {
            data,
            included: included.items,
        }
    }

    /// Document answering a relationship endpoint for one owner.
    ///
    /// `related` is the owner's relationship member or the related records
    /// returned by storage; `fallback_self` is used when the relationship
    /// declares no self-link template.
    #[must_use]
    pub fn relationship_document(
        &self,
        relationship: &RelationshipDef,
        owner_id: &str,
        related: Option<&Value>,
        fallback_self: &str,
    ) -> Document {
        let mut links = Map::new();
        links.insert(
            "self".to_owned(),
            Value::String(
                relationship
                    .self_link(owner_id)
                    .unwrap_or_else(|| fallback_self.to_owned()),
            ),
        );
        if let Some(related_link) = relationship.related_link(owner_id) {
            links.insert("related".to_owned(), Value::String(related_link));
        }

        let mut included = IncludedSet::default();
        if let Some(child) = self.include.child(&relationship.name) {
            self.collect_included(relationship, related, child, &mut included);
        }

        Document::data(self.linkage(relationship, related))
            .with_included(included.items)
            .with_links(Value::Object(links))
    }

    /// Resource linkage (`data`) of a relationship member
    #[must_use]
    pub fn linkage(&self, relationship: &RelationshipDef, raw: Option<&Value>) -> Value {
        let identifiers: Vec<Value> = related_entries(raw, &relationship.related_id_field)
            .into_iter()
            .map(|entry| {
                let id = match entry {
                    RelatedEntry::Id(id) => id,
                    RelatedEntry::Record(record) => record
                        .get(&relationship.related_id_field)
                        .and_then(id_value)
                        .unwrap_or_default(),
                };
                json!({ "type": relationship.related_type, "id": id })
            })
            .collect();

        if relationship.is_to_many() {
            Value::Array(identifiers)
        } else {
            identifiers.into_iter().next().unwrap_or(Value::Null)
        }
    }

    fn resource_object(
        &self,
        schema: &SchemaDefinition,
        record: &Record,
        include: &IncludeTree,
        included: &mut IncludedSet,
    ) -> Value {
        let id = schema.id_of(record).unwrap_or_default();

        let mut attributes = Map::new();
        for attribute in &schema.attributes {
            if !self.selected(&schema.type_name, &attribute.name) {
                continue;
            }
            if let Some(value) = record.get(&attribute.name) {
                attributes.insert(attribute.name.clone(), value.clone());
            }
        }

        let mut relationships = Map::new();
        for relationship in &schema.relationships {
            let raw = record.get(&relationship.name);
            let child = include.child(&relationship.name);

            if let Some(child) = child {
                self.collect_included(relationship, raw, child, included);
            }
            if !self.selected(&schema.type_name, &relationship.name) {
                continue;
            }

            let mut member = Map::new();
            let mut links = Map::new();
            if let Some(link) = relationship.self_link(&id) {
                links.insert("self".to_owned(), Value::String(link));
            }
            if let Some(link) = relationship.related_link(&id) {
                links.insert("related".to_owned(), Value::String(link));
            }
            if !links.is_empty() {
                member.insert("links".to_owned(), Value::Object(links));
            }
            if child.is_some() || relationship.include_linkage {
                member.insert("data".to_owned(), self.linkage(relationship, raw));
            }
            if !member.is_empty() {
                relationships.insert(relationship.name.clone(), Value::Object(member));
            }
        }

        let mut object = Map::new();
        object.insert("type".to_owned(), Value::String(schema.type_name.clone()));
        object.insert("id".to_owned(), Value::String(id.clone()));
        if !attributes.is_empty() {
            object.insert("attributes".to_owned(), Value::Object(attributes));
        }
        if !relationships.is_empty() {
            object.insert("relationships".to_owned(), Value::Object(relationships));
        }
        if let Some(link) = schema.self_link(&id) {
            object.insert("links".to_owned(), json!({ "self": link }));
        }
        Value::Object(object)
    }

    fn collect_included(
        &self,
        relationship: &RelationshipDef,
        raw: Option<&Value>,
        child: &IncludeTree,
        included: &mut IncludedSet,
    ) {
        let Some(related_schema) = self.registry.get(&relationship.related_type) else {
            return;
        };
        for entry in related_entries(raw, &relationship.related_id_field) {
            // Bare ids carry nothing to embed.
            let RelatedEntry::Record(record) = entry else {
                continue;
            };
            let Some(id) = related_schema.id_of(record) else {
                continue;
            };
            if included
                .seen
                .insert((related_schema.type_name.clone(), id))
            {
                let object = self.resource_object(related_schema, record, child, included);
                included.items.push(object);
            }
        }
    }
}

/// Entries of a relationship member: bare ids, or records carrying the
/// related id field. Anything else is skipped.
fn related_entries<'r>(raw: Option<&'r Value>, related_id_field: &str) -> Vec<RelatedEntry<'r>> {
    fn entry<'r>(value: &'r Value, related_id_field: &str) -> Option<RelatedEntry<'r>> {
        match value {
            Value::Object(record) if record.contains_key(related_id_field) => {
                Some(RelatedEntry::Record(record))
            }
            other => id_value(other).map(RelatedEntry::Id),
        }
    }

    match raw {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| entry(item, related_id_field))
            .collect(),
        Some(value) => entry(value, related_id_field).into_iter().collect(),
    }
}
