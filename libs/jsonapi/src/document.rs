//! Wire-level building blocks of success documents.

use jsonapi_errors::JsonApiInfo;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored resource as exchanged with storage: a flat JSON object whose
/// identifier lives under the schema's id field.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
}

impl ResourceIdentifier {
    #[must_use]
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

/// Relationship data of a payload, shaped by cardinality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Linkage {
    One(Option<ResourceIdentifier>),
    Many(Vec<ResourceIdentifier>),
}

impl Linkage {
    #[must_use]
    pub fn identifiers(&self) -> &[ResourceIdentifier] {
        match self {
            Linkage::One(one) => one.as_slice(),
            Linkage::Many(many) => many,
        }
    }

    /// Value stored on the owner record: an id, `null`, or a list of ids
    #[must_use]
    pub fn to_record_value(&self) -> Value {
        match self {
            Linkage::One(None) => Value::Null,
            Linkage::One(Some(identifier)) => Value::String(identifier.id.clone()),
            Linkage::Many(many) => many
                .iter()
                .map(|identifier| Value::String(identifier.id.clone()))
                .collect(),
        }
    }
}

/// Top-level success document.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use]
pub struct Document {
    pub data: Option<Value>,
    pub included: Vec<Value>,
    pub links: Option<Value>,
    pub meta: Option<Value>,
    pub jsonapi: JsonApiInfo,
}

impl Document {
    pub fn data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    pub fn meta(meta: Value) -> Self {
        Self {
            meta: Some(meta),
            ..Self::default()
        }
    }

    pub fn with_included(mut self, included: Vec<Value>) -> Self {
        self.included = included;
        self
    }

    pub fn with_links(mut self, links: Value) -> Self {
        self.links = Some(links);
        self
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        let mut doc = Map::new();
        if let Some(data) = self.data {
            doc.insert("data".to_owned(), data);
        }
        if !self.included.is_empty() {
            doc.insert("included".to_owned(), Value::Array(self.included));
        }
        if let Some(links) = self.links {
            doc.insert("links".to_owned(), links);
        }
        if let Some(meta) = self.meta {
            doc.insert("meta".to_owned(), meta);
        }
        doc.insert(
            "jsonapi".to_owned(),
            serde_json::json!({ "version": self.jsonapi.version }),
        );
        Value::Object(doc)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn linkage_serializes_by_cardinality() {
        let one = Linkage::One(Some(ResourceIdentifier::new("team", "1")));
        let none = Linkage::One(None);
        let many = Linkage::Many(vec![
            ResourceIdentifier::new("student", "1"),
            ResourceIdentifier::new("student", "2"),
        ]);
        assert_eq!(serde_json::to_value(&one).unwrap(), json!({"type": "team", "id": "1"}));
        assert_eq!(serde_json::to_value(&none).unwrap(), Value::Null);
        assert_eq!(many.to_record_value(), json!(["1", "2"]));
        assert_eq!(none.to_record_value(), Value::Null);
        assert_eq!(one.identifiers().len(), 1);
    }

    #[test]
    fn document_keeps_null_data_and_skips_empty_members() {
        let doc = Document::data(Value::Null).into_value();
        assert_eq!(doc, json!({"data": null, "jsonapi": {"version": "1.0"}}));

        let doc = Document::meta(json!({"message": "Object successfully deleted"})).into_value();
        assert_eq!(
            doc,
            json!({"meta": {"message": "Object successfully deleted"}, "jsonapi": {"version": "1.0"}})
        );
    }
}
