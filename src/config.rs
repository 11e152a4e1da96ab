//! Configuration for the site search host.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use site_search_core::SearchConfig;

use crate::catalog::IndexDef;
use crate::error::{Result, SiteSearchError};
use crate::permissions::{Permission, User, UserDef, DEFAULT_GLOBAL_PERMISSION};

/// Top-level configuration, usually read from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSearchConfig {
    /// JSON dataset to search. Relative paths resolve against the working
    /// directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<PathBuf>,
    /// Orchestrator behaviour.
    pub search: SearchConfig,
    /// Authorization settings.
    pub permissions: PermissionsConfig,
    /// Indices to register at startup.
    pub indices: Vec<IndexDef>,
    /// Named users with preset permissions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<UserDef>,
}

/// `[permissions]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Permission that unlocks every record type.
    pub global_permission: String,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            global_permission: DEFAULT_GLOBAL_PERMISSION.to_owned(),
        }
    }
}

impl PermissionsConfig {
    /// The configured global permission, parsed.
    ///
    /// # Errors
    ///
    /// Returns [`SiteSearchError::Config`] for an invalid permission name.
    pub fn global(&self) -> Result<Permission> {
        self.global_permission
            .parse()
            .map_err(|e| SiteSearchError::Config(format!("permissions.global_permission: {e}")))
    }
}

impl SiteSearchConfig {
    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns [`SiteSearchError::Config`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        self.search
            .validate()
            .map_err(|e| SiteSearchError::Config(e.to_string()))?;
        self.permissions.global()?;
        for def in &self.indices {
            def.validate()?;
        }
        let mut names = HashSet::new();
        for user in &self.users {
            if user.name.trim().is_empty() {
                return Err(SiteSearchError::Config("users: name must not be empty".into()));
            }
            if !names.insert(user.name.as_str()) {
                return Err(SiteSearchError::Config(format!(
                    "users: duplicate user {:?}",
                    user.name
                )));
            }
        }
        Ok(())
    }

    /// The user called `name`: the configured entry if there is one,
    /// otherwise a regular user without permissions.
    pub fn user(&self, name: &str) -> User {
        self.users
            .iter()
            .find(|def| def.name == name)
            .map_or_else(|| User::new(name), UserDef::to_user)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| SiteSearchError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| SiteSearchError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/site-search/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("site-search").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("site-search")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/site-search-config/config.toml")
        }
    }
}
