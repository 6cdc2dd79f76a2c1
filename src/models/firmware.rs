//! Firmware presentation model for the web UI

use serde::{Deserialize, Serialize};

use crate::config::{FirmwareSource, SourcesConfig};

/// Information about one manifest entry, enriched with on-disk availability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirmwareInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub platform: String,
    pub description: String,
    pub available: bool,
    pub version: String,
    pub size_kb: f64,
}

impl FirmwareInfo {
    /// Build display info for a manifest entry, checking fetchdir for the binary
    pub fn from_source(source: &FirmwareSource, config: &SourcesConfig) -> Self {
        let firmware_path = config.firmware_path(&source.name);
        let size_kb = std::fs::metadata(&firmware_path)
            .map(|m| m.len() as f64 / 1024.0)
            .unwrap_or(0.0);

        Self {
            name: source.name.clone(),
            source_type: source.source_type.to_string(),
            platform: source
                .platform
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            description: source.description(),
            available: firmware_path.exists(),
            version: source.version(),
            size_kb: (size_kb * 10.0).round() / 10.0,
        }
    }

    /// Info for every manifest entry
    pub fn list_all(config: &SourcesConfig) -> Vec<Self> {
        config
            .sources
            .iter()
            .map(|source| Self::from_source(source, config))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceType;
    use std::path::PathBuf;

    fn sample_config(fetchdir: PathBuf) -> SourcesConfig {
        SourcesConfig {
            fetchdir,
            gpio: None,
            sources: vec![FirmwareSource {
                name: "km271".to_string(),
                source_type: SourceType::Github,
                platform: Some("esp32".to_string()),
                repo: Some("dewenni/ESP_Buderus_KM271".to_string()),
                asset: None,
                current_version: Some("v5.0.0".to_string()),
                path: None,
            }],
        }
    }

    #[test]
    fn test_unavailable_firmware_has_zero_size() {
        let config = sample_config(PathBuf::from("/nonexistent"));
        let info = FirmwareInfo::from_source(&config.sources[0], &config);
        assert!(!info.available);
        assert_eq!(info.size_kb, 0.0);
        assert_eq!(info.version, "v5.0.0");
        assert_eq!(info.source_type, "github");
    }

    #[test]
    fn test_available_firmware_reports_size() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("km271.bin"), vec![0u8; 2048]).unwrap();

        let config = sample_config(temp.path().to_path_buf());
        let info = FirmwareInfo::from_source(&config.sources[0], &config);
        assert!(info.available);
        assert_eq!(info.size_kb, 2.0);
    }
}
