//! Name resolution seam between the query parser and the resource schemas.

/// Answers the questions the parser needs to validate names.
///
/// Implemented by the schema registry; kept as a trait so the parser stays
/// independent of how schemas are declared.
pub trait ResourceCatalog {
    /// Whether a resource type with this name is declared
    fn contains_type(&self, resource_type: &str) -> bool;

    /// Attribute or relationship member of the type (used for sparse fieldsets)
    fn has_field(&self, resource_type: &str, field: &str) -> bool;

    /// Attribute of the type, or its identifier field (used for sort and filters)
    fn has_attribute(&self, resource_type: &str, attribute: &str) -> bool;

    /// Related type of a relationship declared on the type
    fn related_type(&self, resource_type: &str, relationship: &str) -> Option<&str>;
}
