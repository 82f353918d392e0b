use crate::error::SteleError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Connection and keyspace settings for a [`SteleClient`](crate::SteleClient).
///
/// All store-level policy that is fixed for the life of the client lives here:
/// contact points, credentials and the replication factor used when the
/// keyspace is first created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SteleConfig {
    pub contact_points: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keyspace: String,
    pub replication_factor: u8,
}

impl Default for SteleConfig {
    fn default() -> Self {
        Self {
            contact_points: vec!["127.0.0.1:9042".to_string()],
            username: None,
            password: None,
            keyspace: "stele".to_string(),
            replication_factor: 3,
        }
    }
}

impl SteleConfig {
    /// Loads the config from a JSON file. Missing fields fall back to the
    /// defaults, so a partial file is valid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SteleError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            SteleError::InvalidConfig(format!("cannot read {}: {err}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|err| {
            SteleError::InvalidConfig(format!("cannot parse {}: {err}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::SteleConfig;

    #[test]
    fn defaults_match_store_conventions() {
        let config = SteleConfig::default();
        assert_eq!(config.contact_points, vec!["127.0.0.1:9042".to_string()]);
        assert_eq!(config.replication_factor, 3);
        assert!(config.username.is_none());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: SteleConfig =
            serde_json::from_str(r#"{"keyspace": "results", "username": "argus"}"#)
                .expect("parse config");
        assert_eq!(config.keyspace, "results");
        assert_eq!(config.username.as_deref(), Some("argus"));
        assert_eq!(config.replication_factor, 3);
    }
}
