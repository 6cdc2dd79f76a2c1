//! Firmware manifest (sources.yaml) parsing and lookup

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::{FlasherError, Result};

fn default_fetchdir() -> PathBuf {
    PathBuf::from("./tmpfw")
}

fn default_reset_duration_ms() -> u64 {
    100
}

fn default_active_low() -> bool {
    true
}

/// The parsed sources.yaml manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Directory where downloaded firmware binaries live
    #[serde(default = "default_fetchdir")]
    pub fetchdir: PathBuf,
    /// Optional host GPIO wiring for flash-mode entry
    #[serde(default)]
    pub gpio: Option<GpioConfig>,
    /// Firmware sources by name
    #[serde(default)]
    pub sources: Vec<FirmwareSource>,
}

/// Where a firmware binary comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Release asset downloaded from a GitHub repository
    Github,
    /// Local PlatformIO project directory
    Local,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Github => write!(f, "github"),
            SourceType::Local => write!(f, "local"),
        }
    }
}

/// A single named firmware entry in the manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirmwareSource {
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    /// Target platform label (esp32, esp32s3, ...), informational only
    #[serde(default)]
    pub platform: Option<String>,
    /// GitHub repository in "owner/name" form (github sources)
    #[serde(default)]
    pub repo: Option<String>,
    /// Glob pattern selecting the release asset to download (github sources)
    #[serde(default)]
    pub asset: Option<String>,
    /// Release tag currently present in fetchdir (github sources)
    #[serde(default)]
    pub current_version: Option<String>,
    /// PlatformIO project directory (local sources)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl FirmwareSource {
    /// Human-readable origin of this firmware for display in the web UI
    pub fn description(&self) -> String {
        match self.source_type {
            SourceType::Github => {
                format!("GitHub: {}", self.repo.as_deref().unwrap_or("unknown"))
            }
            SourceType::Local => format!(
                "Local: {}",
                self.path
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            ),
        }
    }

    /// Firmware version label: release tag for github sources, "local" otherwise
    pub fn version(&self) -> String {
        match self.source_type {
            SourceType::Github => self
                .current_version
                .clone()
                .unwrap_or_else(|| "latest".to_string()),
            SourceType::Local => "local".to_string(),
        }
    }
}

/// Host GPIO wiring for putting a device into flash mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpioConfig {
    /// Reset line (BCM numbering)
    #[serde(default)]
    pub reset_pin: Option<u32>,
    /// Boot-select line (BCM numbering)
    #[serde(default)]
    pub boot_pin: Option<u32>,
    /// Power switch line (BCM numbering)
    #[serde(default)]
    pub power_pin: Option<u32>,
    /// Reset pulse width in milliseconds
    #[serde(default = "default_reset_duration_ms")]
    pub reset_duration_ms: u64,
    #[serde(default = "default_active_low")]
    pub reset_active_low: bool,
    #[serde(default = "default_active_low")]
    pub boot_active_low: bool,
}

impl SourcesConfig {
    /// Load and parse a sources.yaml manifest
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FlasherError::Manifest(format!("Sources file not found: {}", path.display()))
            } else {
                FlasherError::Io(e)
            }
        })?;

        serde_yaml::from_str(&content)
            .map_err(|e| FlasherError::Manifest(format!("Error parsing sources file: {}", e)))
    }

    /// Find a firmware source by name
    pub fn find_source(&self, name: &str) -> Option<&FirmwareSource> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Path to the downloaded firmware binary for a named source
    pub fn firmware_path(&self, name: &str) -> PathBuf {
        self.fetchdir.join(format!("{}.bin", name))
    }
}
