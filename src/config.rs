//! Index configuration.

use serde::{Deserialize, Serialize};

use crate::error::IndexResult;

/// Settings of a [`crate::SearchableMessageMap`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Reject messages whose URL signature is already indexed.
    pub suppress_duplicates: bool,
    /// Read-only replica: no duplicate checks, no core word or feed word bookkeeping.
    pub viewer: bool,
    /// Impressions below this level are counted as this level in click-through rates.
    pub impression_respected_level: u32,
}

impl IndexConfig {
    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> IndexResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json() {
        let config = IndexConfig::from_json(r#"{ "suppress_duplicates": true }"#).unwrap();
        assert!(config.suppress_duplicates);
        assert!(!config.viewer);
        assert_eq!(config.impression_respected_level, 0);
    }

    #[test]
    fn test_bad_json() {
        let err = IndexConfig::from_json(r#"{ "viewer": 3 }"#).unwrap_err();
        assert!(matches!(err.kind(), crate::IndexErrorKind::Config(_)));
    }
}
