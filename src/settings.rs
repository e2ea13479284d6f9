//! Settings file
//!
//! Optional TOML overrides for the supervisor timeouts and the SDK root,
//! loaded from the platform config directory or an explicit path. A missing
//! file yields defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use droidhost_supervisor::SupervisorConfig;

/// On-disk settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Android SDK root; flags and environment variables take precedence.
    pub sdk_root: Option<PathBuf>,
    /// Supervisor timeout overrides.
    pub supervisor: Option<SupervisorConfig>,
}

impl Settings {
    /// Load settings from `path`, or from the default location when `None`.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let settings = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(settings)
    }

    /// Effective supervisor configuration.
    pub fn supervisor_config(&self) -> SupervisorConfig {
        self.supervisor.unwrap_or_default()
    }
}

fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("droidhost").join("droidhost.toml"))
}
