use async_trait::async_trait;
use http::HeaderMap;

use crate::error::ResourceError;

/// Caller identity resolved for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
}

impl Principal {
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }
}

/// Resolves the caller of a request before any resource logic runs.
///
/// Returning `Ok(None)` means an anonymous request; an error aborts the request
/// and is rendered like any other resource failure.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Option<Principal>, ResourceError>;
}

/// Treats every request as anonymous.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuthenticator;

#[async_trait]
impl Authenticator for NullAuthenticator {
    async fn authenticate(&self, _headers: &HeaderMap) -> Result<Option<Principal>, ResourceError> {
        Ok(None)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_authenticator_is_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(NullAuthenticator.authenticate(&headers).await.unwrap(), None);
    }
}
