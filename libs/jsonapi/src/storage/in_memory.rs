use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use jsonapi_errors::{ErrorKind, JsonApiError};
use jsonapi_query::{QueryOptions, compare_json};
use parking_lot::RwLock;
use serde_json::Value;

use super::{RelationshipQuery, RequestContext, Storage, StorageResult};
use crate::document::{Record, ResourceIdentifier};
use crate::error::ResourceError;
use crate::schema::{Cardinality, RelationshipDef, SchemaDefinition, SchemaRegistry, id_value};

/// Default number of relationship hops resolved into full records on reads.
const DEFAULT_EXPANSION_DEPTH: usize = 3;

#[derive(Debug, Default)]
struct Table {
    next_id: u64,
    rows: BTreeMap<u64, Record>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mutation {
    Add,
    Replace,
    Remove,
}

type Tables = HashMap<String, Table>;

/// Reference storage keeping every resource type in an ordered in-memory table.
///
/// Identifiers are sequential integers starting at 0. Relationship members are
/// stored as ids and resolved into full related records on reads, so included
/// resources can be served without extra lookups.
#[derive(Debug)]
pub struct InMemoryStorage {
    registry: Arc<SchemaRegistry>,
    tables: RwLock<Tables>,
    expansion_depth: usize,
}

fn parse_key(id: &str) -> Option<u64> {
    id.parse().ok()
}

fn not_found(resource_type: &str, id: &str) -> ResourceError {
    ResourceError::object_not_found(format!("No \"{resource_type}\" with id \"{id}\""))
}

fn related_ids(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(id_value).collect(),
        Some(other) => id_value(other).into_iter().collect(),
        None => Vec::new(),
    }
}

impl InMemoryStorage {
    #[must_use]
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            tables: RwLock::new(HashMap::new()),
            expansion_depth: DEFAULT_EXPANSION_DEPTH,
        }
    }

    #[must_use]
    pub fn with_expansion_depth(mut self, depth: usize) -> Self {
        self.expansion_depth = depth;
        self
    }

    /// Number of stored objects of a type
    #[must_use]
    pub fn len(&self, resource_type: &str) -> usize {
        self.tables
            .read()
            .get(resource_type)
            .map_or(0, |table| table.rows.len())
    }

    #[must_use]
    pub fn is_empty(&self, resource_type: &str) -> bool {
        self.len(resource_type) == 0
    }

    /// Store a record directly, bypassing payload validation. Used for seeding.
    ///
    /// # Errors
    /// Same as [`Storage::create_object`].
    pub fn insert(&self, resource_type: &str, record: Record) -> StorageResult<String> {
        let schema = self.registry.require(resource_type)?;
        self.insert_with(schema, record)
    }

    fn insert_with(&self, schema: &SchemaDefinition, mut record: Record) -> StorageResult<String> {
        let mut tables = self.tables.write();
        Self::check_related(&tables, schema, &record)?;

        let table = tables.entry(schema.type_name.clone()).or_default();
        let key = match record.get(&schema.id_field) {
            None | Some(Value::Null) => table.next_id,
            Some(value) => id_value(value).as_deref().and_then(parse_key).ok_or_else(|| {
                ResourceError::bad_request("/data/id", "Identifiers must be non-negative integers.")
            })?,
        };
        if table.rows.contains_key(&key) {
            return Err(JsonApiError::from_message(
                ErrorKind::ObjectAlreadyPresent,
                format!("\"{}\" with id \"{key}\" already exists", schema.type_name),
            )
            .into());
        }

        record.insert(schema.id_field.clone(), Value::String(key.to_string()));
        table.next_id = table.next_id.max(key.saturating_add(1));
        table.rows.insert(key, record);
        Ok(key.to_string())
    }

    /// Every related id referenced by `record` must exist.
    fn check_related(
        tables: &Tables,
        schema: &SchemaDefinition,
        record: &Record,
    ) -> StorageResult<()> {
        for rel in &schema.relationships {
            let ids = related_ids(record.get(&rel.name));
            let identifiers: Vec<ResourceIdentifier> = ids
                .into_iter()
                .map(|id| ResourceIdentifier::new(rel.related_type.clone(), id))
                .collect();
            Self::check_identifiers(tables, rel, &identifiers)?;
        }
        Ok(())
    }

    fn check_identifiers(
        tables: &Tables,
        rel: &RelationshipDef,
        identifiers: &[ResourceIdentifier],
    ) -> StorageResult<()> {
        let table = tables.get(&rel.related_type);
        for identifier in identifiers {
            let exists = parse_key(&identifier.id)
                .zip(table)
                .is_some_and(|(key, table)| table.rows.contains_key(&key));
            if !exists {
                return Err(ResourceError::related_object_not_found(format!(
                    "No \"{}\" with id \"{}\"",
                    rel.related_type, identifier.id
                )));
            }
        }
        Ok(())
    }

    /// Copy of `record` with relationship ids replaced by related records,
    /// `depth` hops deep.
    fn expand(&self, tables: &Tables, schema: &SchemaDefinition, record: &Record, depth: usize) -> Record {
        let mut out = record.clone();
        if depth == 0 {
            return out;
        }
        for rel in &schema.relationships {
            let (Some(related_schema), Some(table)) =
                (self.registry.get(&rel.related_type), tables.get(&rel.related_type))
            else {
                continue;
            };
            let resolve = |id: &Value| -> Value {
                id_value(id)
                    .as_deref()
                    .and_then(parse_key)
                    .and_then(|key| table.rows.get(&key))
                    .map_or_else(
                        || id.clone(),
                        |related| Value::Object(self.expand(tables, related_schema, related, depth - 1)),
                    )
            };
            let expanded = match record.get(&rel.name) {
                None | Some(Value::Null) => continue,
                Some(Value::Array(items)) => items.iter().map(resolve).collect(),
                Some(other) => resolve(other),
            };
            out.insert(rel.name.clone(), expanded);
        }
        out
    }

    fn schema(&self, ctx: &RequestContext) -> StorageResult<&SchemaDefinition> {
        Ok(self.registry.require(&ctx.resource_type)?)
    }

    fn mutate_relationship(
        &self,
        query: &RelationshipQuery,
        linkage: &[ResourceIdentifier],
        mutation: Mutation,
        ctx: &RequestContext,
    ) -> StorageResult<(Record, bool)> {
        let schema = self.schema(ctx)?;
        let rel = schema
            .relationship_def(&query.relationship)
            .ok_or_else(|| ResourceError::from(ErrorKind::RelationNotFound))?;
        let key = parse_key(&query.owner_id).ok_or_else(|| not_found(&schema.type_name, &query.owner_id))?;

        let mut tables = self.tables.write();
        Self::check_identifiers(&tables, rel, linkage)?;

        let owner = tables
            .get_mut(&schema.type_name)
            .and_then(|table| table.rows.get_mut(&key))
            .ok_or_else(|| not_found(&schema.type_name, &query.owner_id))?;

        let current = related_ids(owner.get(&rel.name));
        let given: Vec<String> = linkage.iter().map(|i| i.id.clone()).collect();

        let next: Vec<String> = match (query.cardinality, mutation) {
            (Cardinality::ToMany, Mutation::Add) => {
                let mut next = current.clone();
                for id in given {
                    if !next.contains(&id) {
                        next.push(id);
                    }
                }
                next
            }
            (Cardinality::ToMany, Mutation::Replace) => {
                let mut next: Vec<String> = Vec::with_capacity(given.len());
                for id in given {
                    if !next.contains(&id) {
                        next.push(id);
                    }
                }
                next
            }
            (Cardinality::ToOne, Mutation::Add) if given.is_empty() => current.clone(),
            (Cardinality::ToOne, Mutation::Add | Mutation::Replace) => given.into_iter().take(1).collect(),
            (_, Mutation::Remove) => current
                .iter()
                .filter(|id| !given.contains(id))
                .cloned()
                .collect(),
        };

        let changed = next != current;
        if changed {
            let value = match query.cardinality {
                Cardinality::ToMany => next.into_iter().map(Value::String).collect(),
                Cardinality::ToOne => next.into_iter().next().map_or(Value::Null, Value::String),
            };
            owner.insert(rel.name.clone(), value);
        }

        let owner = owner.clone();
        Ok((self.expand(&tables, schema, &owner, self.expansion_depth), changed))
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_object(&self, data: Record, ctx: &RequestContext) -> StorageResult<String> {
        let schema = self.schema(ctx)?;
        self.insert_with(schema, data)
    }

    async fn retrieve_object(&self, id: &str, ctx: &RequestContext) -> StorageResult<Record> {
        let schema = self.schema(ctx)?;
        let tables = self.tables.read();
        let record = parse_key(id)
            .and_then(|key| tables.get(&schema.type_name)?.rows.get(&key))
            .ok_or_else(|| not_found(&schema.type_name, id))?;
        Ok(self.expand(&tables, schema, record, self.expansion_depth))
    }

    async fn update_object(
        &self,
        id: &str,
        data: Record,
        ctx: &RequestContext,
    ) -> StorageResult<Record> {
        let schema = self.schema(ctx)?;
        let key = parse_key(id).ok_or_else(|| not_found(&schema.type_name, id))?;

        let mut tables = self.tables.write();
        Self::check_related(&tables, schema, &data)?;
        let row = tables
            .get_mut(&schema.type_name)
            .and_then(|table| table.rows.get_mut(&key))
            .ok_or_else(|| not_found(&schema.type_name, id))?;
        for (member, value) in data {
            if member != schema.id_field {
                row.insert(member, value);
            }
        }
        let updated = row.clone();
        Ok(self.expand(&tables, schema, &updated, self.expansion_depth))
    }

    async fn delete_object(&self, id: &str, ctx: &RequestContext) -> StorageResult<()> {
        let schema = self.schema(ctx)?;
        let mut tables = self.tables.write();
        parse_key(id)
            .and_then(|key| tables.get_mut(&schema.type_name)?.rows.remove(&key))
            .map(|_| ())
            .ok_or_else(|| not_found(&schema.type_name, id))
    }

    async fn retrieve_collection(
        &self,
        options: &QueryOptions,
        ctx: &RequestContext,
    ) -> StorageResult<(Vec<Record>, u64)> {
        let schema = self.schema(ctx)?;
        let tables = self.tables.read();
        let Some(table) = tables.get(&schema.type_name) else {
            return Ok((Vec::new(), 0));
        };

        let mut rows: Vec<&Record> = table
            .rows
            .values()
            .filter(|row| options.filters.iter().all(|clause| clause.matches(row)))
            .collect();

        if !options.sort.is_empty() {
            let sort_value = |row: &Record, field: &str| -> Value {
                let value = row.get(field).cloned().unwrap_or(Value::Null);
                if field == schema.id_field {
                    // ids are stored as strings but ordered numerically
                    id_value(&value)
                        .as_deref()
                        .and_then(parse_key)
                        .map_or(value, Value::from)
                } else {
                    value
                }
            };
            rows.sort_by(|a, b| {
                for key in &options.sort {
                    let ord = compare_json(&sort_value(a, &key.field), &sort_value(b, &key.field))
                        .unwrap_or(Ordering::Equal);
                    let ord = if key.dir.is_ascending() { ord } else { ord.reverse() };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let total = u64::try_from(rows.len()).unwrap_or(u64::MAX);
        let offset = usize::try_from(options.pagination.offset()).unwrap_or(usize::MAX);
        let size = usize::try_from(options.pagination.size).unwrap_or(usize::MAX);
        let page = rows
            .into_iter()
            .skip(offset)
            .take(size)
            .map(|row| self.expand(&tables, schema, row, self.expansion_depth))
            .collect();
        Ok((page, total))
    }

    async fn get_relationship(
        &self,
        query: &RelationshipQuery,
        ctx: &RequestContext,
    ) -> StorageResult<(Record, Vec<Record>)> {
        let owner = self.retrieve_object(&query.owner_id, ctx).await?;
        let related = match owner.get(&query.relationship) {
            Some(Value::Array(items)) => items.iter().filter_map(|v| v.as_object().cloned()).collect(),
            Some(Value::Object(record)) => vec![record.clone()],
            _ => Vec::new(),
        };
        Ok((owner, related))
    }

    async fn create_relationship(
        &self,
        query: &RelationshipQuery,
        linkage: &[ResourceIdentifier],
        ctx: &RequestContext,
    ) -> StorageResult<(Record, bool)> {
        self.mutate_relationship(query, linkage, Mutation::Add, ctx)
    }

    async fn update_relationship(
        &self,
        query: &RelationshipQuery,
        linkage: &[ResourceIdentifier],
        ctx: &RequestContext,
    ) -> StorageResult<(Record, bool)> {
        self.mutate_relationship(query, linkage, Mutation::Replace, ctx)
    }

    async fn delete_relationship(
        &self,
        query: &RelationshipQuery,
        linkage: &[ResourceIdentifier],
        ctx: &RequestContext,
    ) -> StorageResult<(Record, bool)> {
        self.mutate_relationship(query, linkage, Mutation::Remove, ctx)
    }
}
