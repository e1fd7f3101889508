use std::cmp::Ordering;
use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    Contains,
    StartsWith,
    EndsWith,
}

impl FilterOp {
    /// Operator from its query-string name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let op = match name.to_ascii_lowercase().as_str() {
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "gt" => Self::Gt,
            "ge" => Self::Ge,
            "lt" => Self::Lt,
            "le" => Self::Le,
            "in" => Self::In,
            "contains" => Self::Contains,
            "startswith" => Self::StartsWith,
            "endswith" => Self::EndsWith,
            _ => return None,
        };
        Some(op)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::In => "in",
            Self::Contains => "contains",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single `field <op> value` condition. Clauses in a query are AND-ed.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Deserialize)]
struct RawClause {
    name: String,
    op: String,
    val: Value,
}

impl FilterClause {
    #[must_use]
    pub fn new(field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    /// Shorthand `filter[field]=value` form
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value.into())
    }

    /// Parse the JSON form: `[{"name": "age", "op": "gt", "val": 18}, ...]`
    ///
    /// # Errors
    /// Returns `Error::InvalidFilters` if the text is not a JSON array of
    /// clauses, names an unknown operator, or gives `in` a non-array value.
    pub fn parse_json(raw: &str) -> Result<Vec<Self>, Error> {
        let clauses: Vec<RawClause> = serde_json::from_str(raw)
            .map_err(|e| Error::InvalidFilters(format!("Parse error: {e}")))?;

        clauses
            .into_iter()
            .map(|raw| {
                let op = FilterOp::from_name(&raw.op).ok_or_else(|| {
                    Error::InvalidFilters(format!("Unknown filter operator \"{}\"", raw.op))
                })?;
                if op == FilterOp::In && !raw.val.is_array() {
                    return Err(Error::InvalidFilters(format!(
                        "Operator \"in\" on \"{}\" requires an array value",
                        raw.name
                    )));
                }
                if raw.name.trim().is_empty() {
                    return Err(Error::InvalidFilters("Filter name cannot be empty".to_owned()));
                }
                Ok(Self::new(raw.name.trim(), op, raw.val))
            })
            .collect()
    }

    /// Evaluate the clause against a stored record. A missing member is `null`.
    #[must_use]
    pub fn matches(&self, record: &Map<String, Value>) -> bool {
        let actual = record.get(&self.field).unwrap_or(&Value::Null);
        match self.op {
            FilterOp::Eq => loosely_equal(actual, &self.value),
            FilterOp::Ne => !loosely_equal(actual, &self.value),
            FilterOp::Gt => compare_json(actual, &self.value) == Some(Ordering::Greater),
            FilterOp::Ge => matches!(
                compare_json(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::Lt => compare_json(actual, &self.value) == Some(Ordering::Less),
            FilterOp::Le => matches!(
                compare_json(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOp::In => self
                .value
                .as_array()
                .is_some_and(|values| values.iter().any(|v| loosely_equal(actual, v))),
            FilterOp::Contains => match (actual, &self.value) {
                (Value::String(s), Value::String(needle)) => s.contains(needle.as_str()),
                (Value::Array(items), needle) => items.iter().any(|v| loosely_equal(v, needle)),
                _ => false,
            },
            FilterOp::StartsWith => match (actual, &self.value) {
                (Value::String(s), Value::String(prefix)) => s.starts_with(prefix.as_str()),
                _ => false,
            },
            FilterOp::EndsWith => match (actual, &self.value) {
                (Value::String(s), Value::String(suffix)) => s.ends_with(suffix.as_str()),
                _ => false,
            },
        }
    }
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        _ => compare_json(a, b) == Some(Ordering::Equal),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Order two JSON scalars. Numbers compare numerically (a numeric string is
/// accepted against a number), strings lexically, booleans false < true.
/// Mixed or compound values are unordered.
#[must_use]
pub fn compare_json(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(_), Value::Number(_) | Value::String(_))
        | (Value::String(_), Value::Number(_)) => as_number(a)?.partial_cmp(&as_number(b)?),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn parses_json_clauses() {
        let clauses =
            FilterClause::parse_json(r#"[{"name":"age","op":"gt","val":18},{"name":"name","op":"eq","val":"bob"}]"#)
                .unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].op, FilterOp::Gt);
        assert_eq!(clauses[1].value, json!("bob"));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = FilterClause::parse_json("[{name:").unwrap_err();
        assert!(matches!(err, Error::InvalidFilters(msg) if msg.starts_with("Parse error")));
    }

    #[test]
    fn rejects_unknown_operator() {
        let err = FilterClause::parse_json(r#"[{"name":"age","op":"between","val":1}]"#).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidFilters("Unknown filter operator \"between\"".to_owned())
        );
    }

    #[test]
    fn in_requires_array() {
        assert!(FilterClause::parse_json(r#"[{"name":"age","op":"in","val":1}]"#).is_err());
        assert!(FilterClause::parse_json(r#"[{"name":"age","op":"in","val":[1,2]}]"#).is_ok());
    }

    #[test]
    fn matches_numeric_and_string_operators() {
        let student = record(json!({"id": "0", "name": "Alice", "age": 19}));

        assert!(FilterClause::new("age", FilterOp::Ge, json!(19)).matches(&student));
        assert!(!FilterClause::new("age", FilterOp::Gt, json!(19)).matches(&student));
        assert!(FilterClause::new("age", FilterOp::Lt, json!(20.5)).matches(&student));
        assert!(FilterClause::new("age", FilterOp::In, json!([18, 19])).matches(&student));
        assert!(FilterClause::new("name", FilterOp::StartsWith, json!("Al")).matches(&student));
        assert!(FilterClause::new("name", FilterOp::Contains, json!("lic")).matches(&student));
        assert!(!FilterClause::new("name", FilterOp::EndsWith, json!("x")).matches(&student));
        assert!(FilterClause::new("missing", FilterOp::Eq, Value::Null).matches(&student));
    }

    #[test]
    fn shorthand_string_value_matches_numbers() {
        let student = record(json!({"age": 19}));
        assert!(FilterClause::eq("age", "19").matches(&student));
        assert!(FilterClause::new("age", FilterOp::Ne, json!("20")).matches(&student));
    }

    #[test]
    fn mixed_types_are_unordered() {
        assert_eq!(compare_json(&json!(true), &json!(1)), None);
        assert_eq!(compare_json(&json!("b"), &json!("a")), Some(Ordering::Greater));
    }
}
