//! Error catalog: every failure the engine reports maps to one `ErrorKind`

use http::StatusCode;

use crate::object::ErrorObject;

/// Static error definition from catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrDef {
    pub status: u16,
    pub title: &'static str,
    /// Query-string parameter blamed by default (only for querystring kinds).
    pub parameter: Option<&'static str>,
}

impl ErrDef {
    /// Convert this error definition into an error object with the given detail
    #[inline]
    pub fn as_object(&self, detail: impl Into<String>) -> ErrorObject {
        self.default_object().with_detail(detail)
    }

    /// Error object carrying only the title, status and default source
    pub fn default_object(&self) -> ErrorObject {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let object = ErrorObject::new(status, self.title);
        match self.parameter {
            Some(parameter) => object.with_parameter(parameter),
            None => object,
        }
    }
}

/// The closed taxonomy of JSON:API failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    ValidationError,
    InvalidFields,
    InvalidInclude,
    InvalidFilters,
    InvalidSort,
    ObjectNotFound,
    RelatedObjectNotFound,
    RelationNotFound,
    ObjectAlreadyPresent,
    InvalidType,
    InvalidIdentifier,
    Unable,
}

impl ErrorKind {
    #[must_use]
    pub const fn def(self) -> ErrDef {
        const fn def(status: u16, title: &'static str) -> ErrDef {
            ErrDef {
                status,
                title,
                parameter: None,
            }
        }
        const fn qs(title: &'static str, parameter: &'static str) -> ErrDef {
            ErrDef {
                status: 400,
                title,
                parameter: Some(parameter),
            }
        }

        match self {
            Self::BadRequest => def(400, "Bad request"),
            Self::ValidationError => def(422, "Validation error"),
            Self::InvalidFields => qs("Invalid fields querystring parameter", "fields"),
            Self::InvalidInclude => qs("Invalid include querystring parameter", "include"),
            Self::InvalidFilters => qs("Invalid filters querystring parameter", "filters"),
            Self::InvalidSort => qs("Invalid sort querystring parameter", "sort"),
            Self::ObjectNotFound => def(404, "Object not found"),
            Self::RelatedObjectNotFound => def(404, "Related object not found"),
            Self::RelationNotFound => def(404, "Relation object not found"),
            Self::ObjectAlreadyPresent => def(409, "Object already present"),
            Self::InvalidType => def(409, "Invalid type"),
            Self::InvalidIdentifier => def(409, "Invalid identifier"),
            Self::Unable => def(500, "Unable to perform operation"),
        }
    }

    #[must_use]
    pub fn status(self) -> StatusCode {
        StatusCode::from_u16(self.def().status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        self.def().title
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}
