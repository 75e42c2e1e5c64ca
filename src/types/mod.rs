//! Request and response types for the Conductor Quantum API.
//!
//! All response types mirror server state at the moment of the call. Fields
//! the server adds in newer versions are kept in each type's `extra` map
//! instead of failing the decode.

mod model;
mod result;
mod validation;

pub use model::ModelInfo;
pub use result::{ModelResultInfo, ModelResultMasked, ResultId};
pub use validation::{HttpValidationError, LocItem, ValidationError};

/// Pagination parameters for list endpoints.
///
/// Unset values are not sent, leaving the server defaults in effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListParams {
    /// Number of items to skip.
    pub skip: Option<u64>,
    /// Maximum number of items to return.
    pub limit: Option<u64>,
}

impl ListParams {
    /// No pagination, server defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the first `skip` items.
    #[must_use]
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Return at most `limit` items.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::with_capacity(2);
        if let Some(skip) = self.skip {
            query.push(("skip", skip.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_default_sends_nothing() {
        assert!(ListParams::new().query().is_empty());
    }

    #[test]
    fn test_list_params_query() {
        let query = ListParams::new().skip(1).limit(5).query();
        assert_eq!(
            query,
            vec![("skip", "1".to_string()), ("limit", "5".to_string())]
        );
    }

    #[test]
    fn test_list_params_limit_only() {
        let query = ListParams::new().limit(1).query();
        assert_eq!(query, vec![("limit", "1".to_string())]);
    }
}
