//! Operator settings file (`configs.json`)
//!
//! Holds the portal credentials, an optional printer name and the operator
//! list edited from the dashboard. Keys this crate does not know about are
//! carried through untouched on every save.

use crate::config::ConfigError;
use crate::portal::{CredentialProvider, Credentials, PortalError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OperatorEntry")]
pub struct Operator {
    pub name: String,
}

/// Older files list operators as bare strings
#[derive(Deserialize)]
#[serde(untagged)]
enum OperatorEntry {
    Name(String),
    Record { name: String },
}

impl From<OperatorEntry> for Operator {
    fn from(entry: OperatorEntry) -> Self {
        match entry {
            OperatorEntry::Name(name) | OperatorEntry::Record { name } => Operator { name },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortalSettings {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printer: Option<String>,
    #[serde(default)]
    pub operators: Vec<Operator>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<PortalSettings>,
}

impl SettingsStore {
    /// Load the file, writing defaults first when it does not exist yet.
    /// The loaded content is saved back so legacy entries get normalised.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            read_settings(&path)?
        } else {
            log::info!("No settings file at {}, creating defaults", path.display());
            PortalSettings::default()
        };

        let store = Self {
            path,
            data: RwLock::new(data),
        };
        store.persist(&store.data.read().unwrap())?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn reload(&self) -> Result<(), ConfigError> {
        let data = read_settings(&self.path)?;
        *self.data.write().unwrap() = data;
        Ok(())
    }

    pub fn load(&self) -> PortalSettings {
        self.data.read().unwrap().clone()
    }

    pub fn operators(&self) -> Vec<Operator> {
        self.data.read().unwrap().operators.clone()
    }

    pub fn add_operator(&self, name: &str) -> Result<(), ConfigError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::InvalidValue("operator name cannot be empty".to_string()));
        }

        let mut guard = self.data.write().unwrap();
        guard.operators.push(Operator {
            name: name.to_string(),
        });
        self.persist(&guard)
    }

    /// Remove every operator with this name
    pub fn remove_operator(&self, name: &str) -> Result<(), ConfigError> {
        let mut guard = self.data.write().unwrap();
        guard.operators.retain(|op| op.name != name);
        self.persist(&guard)
    }

    fn persist(&self, data: &PortalSettings) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(data)?)?;
        log::debug!("Settings saved to {}", self.path.display());
        Ok(())
    }
}

impl CredentialProvider for SettingsStore {
    /// Re-reads the file so credentials edited on disk are picked up. If the
    /// file cannot be read the last known values are used.
    fn credentials(&self) -> Result<Credentials, PortalError> {
        if let Err(e) = self.reload() {
            log::warn!("⚠️  Could not reload {}: {}", self.path.display(), e);
        }

        let data = self.data.read().unwrap();
        Ok(Credentials {
            username: data.username.clone(),
            password: data.password.clone(),
        })
    }
}

fn read_settings(path: &Path) -> Result<PortalSettings, ConfigError> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
