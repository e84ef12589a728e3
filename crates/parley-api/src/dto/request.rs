//! Request DTOs.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Default number of messages returned by a history query.
pub const DEFAULT_HISTORY_LIMIT: u32 = 100;

/// Query parameters of `GET /api/chats/{username}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct HistoryQuery {
    /// Maximum messages to return (default 100, max 500).
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<u32>,
}

impl HistoryQuery {
    /// Effective limit.
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_bounds() {
        assert_eq!(HistoryQuery::default().limit(), 100);
        assert!(HistoryQuery { limit: Some(500) }.validate().is_ok());
        assert!(HistoryQuery { limit: Some(501) }.validate().is_err());
        assert!(HistoryQuery { limit: Some(0) }.validate().is_err());
    }
}
