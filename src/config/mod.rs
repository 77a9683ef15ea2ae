//! Engine configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Tunables of the reaction loop.
///
/// Everything here is fixed for the lifetime of an engine; per-reaction
/// parameters live in the reaction descriptors instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of integrator steps between reaction attempts
    pub interval: u64,

    /// Partner choice in the unique-A/unique-B passes: nearest candidate
    /// (ties broken randomly) instead of a uniformly random candidate
    pub nearest_mode: bool,

    /// Cap on accepted reactions per invocation, across all ranks
    pub max_per_interval: u64,

    /// When set, the squared distance of every accepted bond is logged and
    /// appended to this file at the end of each invocation
    pub pair_distance_filename: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval: 1,
            nearest_mode: false,
            max_per_interval: u64::MAX,
            pair_distance_filename: None,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file or return defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded engine config from {:?}", path.as_ref());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse engine config: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Engine config file not found, using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.interval, 1);
        assert!(!config.nearest_mode);
        assert_eq!(config.max_per_interval, u64::MAX);
        assert!(config.pair_distance_filename.is_none());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = EngineConfig {
            interval: 10,
            nearest_mode: true,
            max_per_interval: 5,
            pair_distance_filename: Some(PathBuf::from("pd.log")),
        };
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.interval, 10);
        assert!(parsed.nearest_mode);
        assert_eq!(parsed.max_per_interval, 5);
        assert_eq!(parsed.pair_distance_filename, config.pair_distance_filename);
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let config = EngineConfig::load_or_default("definitely/not/here.json");
        assert_eq!(config.interval, 1);
    }
}
