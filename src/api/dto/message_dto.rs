//! Message request DTOs and history query parameters.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Body of `POST /api/chat/conversations/{id}/messages`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    /// Message text. Must not be empty or whitespace-only; stored
    /// untrimmed beyond that check.
    pub text: String,
}

/// Query parameters of `GET /api/chat/conversations/{id}/messages`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct HistoryParams {
    /// Maximum number of messages to return. Defaults to the configured
    /// page limit; clamped to it as an upper bound.
    pub limit: Option<i64>,
    /// Only messages sent strictly before this instant (RFC 3339) are
    /// returned. Cursor for paging backwards through history.
    pub before: Option<DateTime<Utc>>,
}

impl HistoryParams {
    /// Effective page size given the configured default/maximum.
    #[must_use]
    pub fn effective_limit(&self, max: i64) -> i64 {
        self.limit.map_or(max, |l| l.clamp(1, max))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_clamps() {
        let none = HistoryParams {
            limit: None,
            before: None,
        };
        assert_eq!(none.effective_limit(100), 100);

        let small = HistoryParams {
            limit: Some(10),
            before: None,
        };
        assert_eq!(small.effective_limit(100), 10);

        let oversized = HistoryParams {
            limit: Some(10_000),
            before: None,
        };
        assert_eq!(oversized.effective_limit(100), 100);

        let nonsense = HistoryParams {
            limit: Some(-5),
            before: None,
        };
        assert_eq!(nonsense.effective_limit(100), 1);
    }
}
