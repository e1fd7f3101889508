//! Payload loading: JSON:API request documents into validated records.
//!
//! Failures are reported in a fixed precedence: a wrong resource type wins
//! (409), then structural problems such as missing or mistyped attributes
//! (400, all of them at once), then value constraints (422).

use std::collections::BTreeMap;

use jsonapi_errors::{ErrorKind, ErrorObject, JsonApiError};
use serde_json::{Number, Value};

use crate::derive::DerivedSchema;
use crate::document::{Linkage, Record, ResourceIdentifier};
use crate::schema::{AttributeDef, AttributeKind, Cardinality, RelationshipDef, SchemaDefinition, id_value};

/// A validated payload, ready to be handed to storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedResource {
    pub id: Option<String>,
    pub attributes: Record,
    pub relationships: BTreeMap<String, Linkage>,
}

impl LoadedResource {
    /// Flatten into a storage record: attributes, the id under the schema's id
    /// field, and relationship members as ids.
    #[must_use]
    pub fn into_record(self, schema: &SchemaDefinition) -> Record {
        let mut record = self.attributes;
        if let Some(id) = self.id {
            record.insert(schema.id_field.clone(), Value::String(id));
        }
        for (name, linkage) in self.relationships {
            record.insert(name, linkage.to_record_value());
        }
        record
    }
}

fn bad(pointer: impl Into<String>, detail: impl Into<String>) -> ErrorObject {
    ErrorKind::BadRequest.def().as_object(detail).with_pointer(pointer)
}

fn wrong_type(pointer: impl Into<String>, expected: &str) -> ErrorObject {
    ErrorKind::InvalidType
        .def()
        .as_object(format!("Invalid type. Expected \"{expected}\"."))
        .with_pointer(pointer)
}

/// Parse the `data` member of a relationship payload.
///
/// `base` is the JSON pointer of `data` itself; identifier problems are
/// reported at `{base}/type` and `{base}/id`. `null` is accepted only when
/// `allow_null` is set and then clears the relationship.
///
/// # Errors
/// - `InvalidType` if any identifier names another type than the related one
/// - `BadRequest` for missing `type`/`id`, wrong shapes, or several
///   identifiers on a to-one relationship
pub fn parse_linkage(
    data: &Value,
    relationship: &RelationshipDef,
    base: &str,
    allow_null: bool,
) -> Result<Linkage, JsonApiError> {
    let entries: Vec<&Value> = match data {
        Value::Null if allow_null => Vec::new(),
        Value::Null => {
            return Err(JsonApiError::from_pointer_and_message(
                ErrorKind::BadRequest,
                base,
                "Relationship data cannot be null for this operation.",
            ));
        }
        Value::Object(_) => vec![data],
        Value::Array(items) => items.iter().collect(),
        _ => {
            return Err(JsonApiError::from_pointer_and_message(
                ErrorKind::BadRequest,
                base,
                "Expected a resource identifier object or an array of them.",
            ));
        }
    };

    if relationship.cardinality == Cardinality::ToOne && entries.len() > 1 {
        return Err(JsonApiError::from_pointer_and_message(
            ErrorKind::BadRequest,
            base,
            format!("Relationship \"{}\" holds a single resource.", relationship.name),
        ));
    }

    let mut identifiers = Vec::with_capacity(entries.len());
    let mut type_errors = Vec::new();
    let mut structural = Vec::new();
    for entry in entries {
        let Some(object) = entry.as_object() else {
            structural.push(bad(base, "Expected a resource identifier object."));
            continue;
        };
        let resource_type = object.get("type").and_then(Value::as_str);
        let id = object.get("id").and_then(id_value);
        match resource_type {
            None => structural.push(bad(
                format!("{base}/type"),
                "`data` object must include `type` key.",
            )),
            Some(t) if t != relationship.related_type => {
                type_errors.push(wrong_type(format!("{base}/type"), &relationship.related_type));
            }
            Some(_) => {}
        }
        if id.is_none() {
            structural.push(bad(format!("{base}/id"), "`data` object must include `id` key."));
        }
        if let (Some(t), Some(id)) = (resource_type, id) {
            identifiers.push(ResourceIdentifier::new(t, id));
        }
    }

    if !type_errors.is_empty() {
        return Err(JsonApiError::with_errors(ErrorKind::InvalidType, type_errors));
    }
    if !structural.is_empty() {
        return Err(JsonApiError::with_errors(ErrorKind::BadRequest, structural));
    }

    Ok(match relationship.cardinality {
        Cardinality::ToOne => Linkage::One(identifiers.into_iter().next()),
        Cardinality::ToMany => Linkage::Many(identifiers),
    })
}

/// Coerce a payload value to the attribute's kind, or name what is wrong with it.
fn coerce(kind: AttributeKind, value: &Value) -> Result<Value, &'static str> {
    match (kind, value) {
        (AttributeKind::Any, v) => Ok(v.clone()),
        (AttributeKind::String, Value::String(_))
        | (AttributeKind::Boolean, Value::Bool(_))
        | (AttributeKind::Object, Value::Object(_))
        | (AttributeKind::Array, Value::Array(_))
        | (AttributeKind::Number, Value::Number(_)) => Ok(value.clone()),
        (AttributeKind::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        (AttributeKind::Integer, Value::Number(n)) => n
            .as_f64()
            .and_then(integral)
            .map(Value::from)
            .ok_or("Not a valid integer."),
        (AttributeKind::Integer, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| "Not a valid integer."),
        (AttributeKind::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or("Not a valid number."),
        (AttributeKind::String, _) => Err("Not a valid string."),
        (AttributeKind::Integer, _) => Err("Not a valid integer."),
        (AttributeKind::Number, _) => Err("Not a valid number."),
        (AttributeKind::Boolean, _) => Err("Not a valid boolean."),
        (AttributeKind::Object, _) => Err("Not a valid mapping type."),
        (AttributeKind::Array, _) => Err("Not a valid list."),
    }
}

/// 2^63, the first float past `i64::MAX`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// `19.0` is an integer; `19.5` and out-of-range values are not.
#[allow(clippy::cast_possible_truncation)]
fn integral(f: f64) -> Option<i64> {
    (f.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(&f)).then(|| f as i64)
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Constraint violations of an already coerced value.
fn violations(attribute: &AttributeDef, value: &Value) -> Vec<String> {
    let c = &attribute.constraints;
    let mut out = Vec::new();

    if let Some(number) = value.as_f64() {
        if let Some(min) = c.min.filter(|min| number < *min) {
            out.push(format!("Must be greater than or equal to {min}."));
        }
        if let Some(max) = c.max.filter(|max| number > *max) {
            out.push(format!("Must be less than or equal to {max}."));
        }
    }

    let length = match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    };
    if let Some(length) = length {
        if let Some(min) = c.min_length.filter(|min| length < *min) {
            out.push(format!("Shorter than minimum length {min}."));
        }
        if let Some(max) = c.max_length.filter(|max| length > *max) {
            out.push(format!("Longer than maximum length {max}."));
        }
    }

    if let Some(choices) = &c.one_of
        && !choices.contains(value)
    {
        let rendered: Vec<String> = choices.iter().map(render).collect();
        out.push(format!("Must be one of: {}.", rendered.join(", ")));
    }
    out
}

impl DerivedSchema<'_> {
    /// Load a request document into a validated resource.
    ///
    /// In partial mode absent attributes are not reported as missing.
    /// Unknown and dump-only attributes are ignored.
    ///
    /// # Errors
    /// - `InvalidType` when `data.type` (or a nested relationship identifier)
    ///   names another type
    /// - `BadRequest` with one error object per structural problem
    /// - `ValidationError` with one error object per constraint violation
    pub fn load(&self, document: &Value) -> Result<LoadedResource, JsonApiError> {
        let schema = self.base();
        let Some(data) = document.get("data").and_then(Value::as_object) else {
            return Err(JsonApiError::from_pointer_and_message(
                ErrorKind::BadRequest,
                "/data",
                "Object must include `data` key.",
            ));
        };

        match data.get("type").and_then(Value::as_str) {
            None => {
                return Err(JsonApiError::from_pointer_and_message(
                    ErrorKind::BadRequest,
                    "/data/type",
                    "`data` object must include `type` key.",
                ));
            }
            Some(t) if t != schema.type_name => {
                return Err(JsonApiError::with_errors(
                    ErrorKind::InvalidType,
                    vec![wrong_type("/data/type", &schema.type_name)],
                ));
            }
            Some(_) => {}
        }

        let mut structural = Vec::new();
        let mut constraint = Vec::new();
        let mut loaded = LoadedResource {
            id: data.get("id").and_then(id_value),
            ..LoadedResource::default()
        };

        let empty = Record::new();
        let attributes = match data.get("attributes") {
            None => &empty,
            Some(Value::Object(attributes)) => attributes,
            Some(_) => {
                return Err(JsonApiError::from_pointer_and_message(
                    ErrorKind::BadRequest,
                    "/data/attributes",
                    "`attributes` must be an object.",
                ));
            }
        };

        for attribute in schema.attributes.iter().filter(|a| !a.dump_only) {
            let pointer = format!("/data/attributes/{}", attribute.name);
            let value = match attributes.get(&attribute.name) {
                None => {
                    if attribute.required && !self.mode().partial {
                        structural.push(bad(pointer, "Missing data for required field."));
                    }
                    continue;
                }
                Some(Value::Null) => {
                    if attribute.nullable {
                        loaded.attributes.insert(attribute.name.clone(), Value::Null);
                    } else {
                        structural.push(bad(pointer, "Field may not be null."));
                    }
                    continue;
                }
                Some(value) => value,
            };

            match coerce(attribute.kind, value) {
                Ok(coerced) => {
                    for message in violations(attribute, &coerced) {
                        constraint.push(
                            ErrorKind::ValidationError
                                .def()
                                .as_object(message)
                                .with_pointer(pointer.clone()),
                        );
                    }
                    loaded.attributes.insert(attribute.name.clone(), coerced);
                }
                Err(message) => structural.push(bad(pointer, message)),
            }
        }

        if let Some(relationships) = data.get("relationships") {
            let Some(relationships) = relationships.as_object() else {
                return Err(JsonApiError::from_pointer_and_message(
                    ErrorKind::BadRequest,
                    "/data/relationships",
                    "`relationships` must be an object.",
                ));
            };
            for relationship in &schema.relationships {
                let Some(member) = relationships.get(&relationship.name) else {
                    continue;
                };
                let pointer = format!("/data/relationships/{}", relationship.name);
                let Some(linkage_data) = member.get("data") else {
                    structural.push(bad(pointer, "Relationship must include `data` key."));
                    continue;
                };
                match parse_linkage(linkage_data, relationship, &format!("{pointer}/data"), true) {
                    Ok(linkage) => {
                        loaded.relationships.insert(relationship.name.clone(), linkage);
                    }
                    Err(err) if err.kind() == ErrorKind::InvalidType => return Err(err),
                    Err(err) => structural.extend(err.errors().iter().cloned()),
                }
            }
        }

        if !structural.is_empty() {
            return Err(JsonApiError::with_errors(ErrorKind::BadRequest, structural));
        }
        if !constraint.is_empty() {
            return Err(JsonApiError::with_errors(ErrorKind::ValidationError, constraint));
        }
        Ok(loaded)
    }
}
