//! SDK configuration.
//!
//! Every key is optional; an empty document yields [`SdkConfig::default`].
//!
//! ```toml
//! convention = "auto"
//!
//! [notifications]
//! default-type = "basic"
//! default-icon-url = "icons/48.png"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use webext_host_api::ConventionOverride;

use crate::entities::notification::TemplateType;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SdkConfig {
    /// Force the host calling convention instead of probing the manifest.
    pub convention: ConventionOverride,
    pub notifications: NotificationDefaults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NotificationDefaults {
    pub default_type: TemplateType,
    pub default_icon_url: Option<String>,
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            default_type: TemplateType::Basic,
            default_icon_url: None,
        }
    }
}

/// Serialization formats a configuration document may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
    Yaml,
}

impl ConfigFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "json" => Some(ConfigFormat::Json),
            "toml" => Some(ConfigFormat::Toml),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            _ => None,
        }
    }
}

impl SdkConfig {
    /// Loads a configuration file, detecting the format by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read SDK config file: {:?}", path))?;

        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        let Some(format) = ConfigFormat::from_extension(ext) else {
            anyhow::bail!("Unsupported config format: {}", ext);
        };

        Self::parse(&content, format)
    }

    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Json => {
                serde_json::from_str(content).with_context(|| "Failed to parse JSON config")
            }
            ConfigFormat::Toml => {
                toml::from_str(content).with_context(|| "Failed to parse TOML config")
            }
            ConfigFormat::Yaml => {
                serde_yaml::from_str(content).with_context(|| "Failed to parse YAML config")
            }
        }
    }
}
