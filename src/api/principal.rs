//! Trusted principal identity extractor.
//!
//! Identity verification happens outside this service: the fronting
//! authentication layer validates credentials and injects the subject into
//! the `x-user-id` header. The relay trusts that header and never inspects
//! tokens itself. Requests without it are rejected with 401 before any
//! handler logic runs.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ChatError;

/// Header carrying the authenticated subject, set by the auth proxy.
pub const PRINCIPAL_HEADER: &str = "x-user-id";

/// Authenticated principal identity attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal(String);

impl Principal {
    /// The principal identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the extractor, returning the identity.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ChatError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(PRINCIPAL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        match value {
            Some(subject) => Ok(Self(subject.to_string())),
            None => Err(ChatError::Unauthorized),
        }
    }
}
