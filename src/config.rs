use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub leader: PeerInfo,
    pub followers: Vec<PeerInfo>,
    #[serde(rename = "timeout")]
    pub timeout_ms: u64,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.leader.name.trim().is_empty() {
            return Err(ConfigError::EmptyLeaderName);
        }
        if self.followers.is_empty() {
            return Err(ConfigError::NoFollowers);
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        let mut seen = HashSet::new();
        for follower in &self.followers {
            if !seen.insert(follower.name.as_str()) {
                return Err(ConfigError::DuplicateFollower(follower.name.clone()));
            }
        }
        Ok(())
    }

    pub fn follower(&self, name: &str) -> Result<&PeerInfo, ConfigError> {
        self.followers
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::UnknownFollower(name.to_owned()))
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "leader": {"name": "leader", "address": "127.0.0.1:9000"},
            "followers": [
                {"name": "p1", "address": "127.0.0.1:9001"},
                {"name": "p2", "address": "127.0.0.1:9002"}
            ],
            "timeout": 1000
        }"#
    }

    #[test]
    fn parses_valid_config() {
        let config: Config = serde_json::from_str(sample_json()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.leader.name, "leader");
        assert_eq!(config.followers.len(), 2);
        assert_eq!(config.timeout_ms, 1000);
    }

    #[test]
    fn rejects_empty_followers() {
        let config = Config {
            leader: PeerInfo {
                name: "leader".into(),
                address: "a".into(),
            },
            followers: vec![],
            timeout_ms: 1000,
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoFollowers)));
    }

    #[test]
    fn rejects_duplicate_follower_names() {
        let config = Config {
            leader: PeerInfo {
                name: "leader".into(),
                address: "a".into(),
            },
            followers: vec![
                PeerInfo {
                    name: "p1".into(),
                    address: "a".into(),
                },
                PeerInfo {
                    name: "p1".into(),
                    address: "b".into(),
                },
            ],
            timeout_ms: 1000,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateFollower(name)) if name == "p1"
        ));
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = Config {
            leader: PeerInfo {
                name: "leader".into(),
                address: "a".into(),
            },
            followers: vec![PeerInfo {
                name: "p1".into(),
                address: "a".into(),
            }],
            timeout_ms: 0,
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        assert!(matches!(
            Config::load("/nonexistent/path/berkeley.json"),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = std::env::temp_dir().join(format!(
            "berkeley-sync-test-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }
}
