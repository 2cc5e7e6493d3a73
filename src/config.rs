use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::routing::ChannelMapping;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Discord bot token
    pub token: String,
    #[serde(default)]
    pub channel_mappings: Vec<ChannelMapping>,
    /// RGB colour of forwarded embeds
    #[serde(default = "default_embed_color")]
    pub embed_color: u32,
}

/// Discord's stock "blue".
fn default_embed_color() -> u32 {
    0x3498db
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let config = if is_toml {
            Self::from_toml(&content)
        } else {
            Self::from_yaml(&content)
        }
        .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(content).context("Failed to parse YAML config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse TOML config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            bail!("`token` must not be empty");
        }
        // Snowflakes are non-zero; serenity panics on a zero ChannelId.
        for (index, mapping) in self.channel_mappings.iter().enumerate() {
            if mapping.source == 0 || mapping.target == 0 {
                bail!(
                    "channel_mappings[{}] has a zero channel id (source {}, target {})",
                    index,
                    mapping.source,
                    mapping.target
                );
            }
        }
        Ok(())
    }
}
