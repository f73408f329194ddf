use crate::chunk::{ChunkBudget, DEFAULT_CHUNK_SIZE};
use crate::error::{BlobWriterError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Process-wide settings stored as TOML. Every field has a default, so an
/// empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlobWriterConfig {
    #[serde(default)]
    pub bridge: BridgeSettings,
    #[serde(default)]
    pub fast_channel: FastChannelSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSettings {
    /// Bytes per appended chunk. Must be a non-zero multiple of 3.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

impl BridgeSettings {
    pub fn chunk_budget(&self) -> Result<ChunkBudget> {
        ChunkBudget::new(self.chunk_size)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FastChannelSettings {
    /// Deadline for the whole fast-channel attempt. Unset means wait indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl FastChannelSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Settings for the local transport endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    /// Lowest port tried (inclusive). Defaults to the start of the private range.
    #[serde(default = "default_port_min")]
    pub port_min: u16,
    /// Highest port tried (inclusive).
    #[serde(default = "default_port_max")]
    pub port_max: u16,
    /// How many random ports to try before giving up.
    #[serde(default = "default_start_retries")]
    pub start_retries: u32,
    /// Where uploads are staged before being moved into place.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            port_min: default_port_min(),
            port_max: default_port_max(),
            start_retries: default_start_retries(),
            temp_dir: None,
        }
    }
}

impl ServerSettings {
    /// Staging directory, falling back to `<cache dir>/blobwriter`.
    pub fn resolve_temp_dir(&self) -> PathBuf {
        match &self.temp_dir {
            Some(dir) => dir.clone(),
            None => dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("blobwriter"),
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_bind_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port_min() -> u16 {
    49151
}

fn default_port_max() -> u16 {
    65535
}

fn default_start_retries() -> u32 {
    5
}

impl BlobWriterConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BlobWriterError::ConfigNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| BlobWriterError::TomlDe(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| BlobWriterError::TomlSer(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.bridge.chunk_budget()?;
        if self.server.port_min > self.server.port_max {
            return Err(BlobWriterError::Config(format!(
                "empty port range {}..={}",
                self.server.port_min, self.server.port_max
            )));
        }
        if self.server.start_retries == 0 {
            return Err(BlobWriterError::Config(
                "start_retries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
