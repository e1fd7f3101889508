//! Mapping from query-string errors to JSON:API errors (pure data)

use jsonapi_errors::{ErrorKind, JsonApiError};

use crate::Error;

impl From<Error> for JsonApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidFields(detail) => JsonApiError::from_message(ErrorKind::InvalidFields, detail),
            Error::InvalidInclude(detail) => {
                JsonApiError::from_message(ErrorKind::InvalidInclude, detail)
            }
            Error::InvalidSort(detail) => JsonApiError::from_message(ErrorKind::InvalidSort, detail),
            Error::InvalidFilters(detail) => {
                JsonApiError::from_message(ErrorKind::InvalidFilters, detail)
            }
            Error::InvalidPage { parameter, detail } => {
                JsonApiError::from_parameter_and_message(ErrorKind::BadRequest, parameter, detail)
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn querystring_errors_keep_their_parameter() {
        let err: JsonApiError = Error::InvalidSort("\"student\" has no attribute \"x\"".to_owned()).into();
        assert_eq!(err.kind(), ErrorKind::InvalidSort);
        assert_eq!(err.status().as_u16(), 400);
        let source = err.errors()[0].source.clone().unwrap();
        assert_eq!(source.parameter.as_deref(), Some("sort"));
    }

    #[test]
    fn page_errors_are_bad_requests_on_the_offending_key() {
        let err: JsonApiError = Error::InvalidPage {
            parameter: "page[number]".to_owned(),
            detail: "must be a non-negative integer".to_owned(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(
            err.errors()[0]
                .source
                .as_ref()
                .and_then(|s| s.parameter.as_deref()),
            Some("page[number]")
        );
    }
}
