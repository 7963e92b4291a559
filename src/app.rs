use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use log::warn;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::models::Credentials;
use crate::error::{ConfigError, ValidationError};
use crate::utils::normalize_url;

pub const DEFAULT_API_URL: &str = "https://7103.api.greenapi.com";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

/// Persisted client settings. Holds the credential record between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub credentials: Option<Credentials>,
}

impl Default for AppState {
    fn default() -> Self {
        Self { api_url: default_api_url(), credentials: None }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toml_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("greenchat.toml"))
    }

    pub fn load() -> Self {
        match Self::toml_path() {
            Some(path) => Self::load_from(&path),
            None => Self::new(),
        }
    }

    /// Missing or unreadable files yield the defaults.
    pub fn load_from(path: &Path) -> Self {
        let Ok(text) = fs::read_to_string(path) else {
            return Self::new();
        };
        match toml::from_str::<AppState>(&text) {
            Ok(state) => state,
            Err(e) => {
                warn!("ignoring unreadable config {}: {e}", path.display());
                Self::new()
            }
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::toml_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml)?;
        Ok(())
    }

    pub fn set_api_url(&mut self, input: &str) -> Result<(), ConfigError> {
        let normalized = normalize_url(input);
        Url::parse(&normalized).map_err(|e| ConfigError::InvalidUrl(input.to_string(), e))?;
        self.api_url = normalized;
        Ok(())
    }

    /// Replaces the stored credentials wholesale.
    pub fn login(&mut self, instance_id: &str, access_token: &str) -> Result<&Credentials, ValidationError> {
        let instance_id = instance_id.trim();
        let access_token = access_token.trim();
        if instance_id.is_empty() || access_token.is_empty() {
            return Err(ValidationError::MissingCredentials);
        }
        Ok(&*self.credentials.insert(Credentials {
            instance_id: instance_id.to_string(),
            access_token: access_token.to_string(),
        }))
    }

    /// Forgets the credentials. Chat history stored under the instance id is
    /// kept, so logging in again with the same instance restores it.
    pub fn logout(&mut self) -> Option<Credentials> {
        self.credentials.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("greenchat.toml");
        let mut state = AppState::new();
        state.login("100", "abc").unwrap();
        state.save_to(&path).unwrap();

        assert_eq!(AppState::load_from(&path), state);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::load_from(&dir.path().join("none.toml"));
        assert_eq!(state.api_url, DEFAULT_API_URL);
        assert!(state.credentials.is_none());
    }

    #[test]
    fn unreadable_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greenchat.toml");
        fs::write(&path, "api_url = [").unwrap();
        assert_eq!(AppState::load_from(&path), AppState::new());
    }

    #[test]
    fn credentials_are_stored_under_gateway_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greenchat.toml");
        let mut state = AppState::new();
        state.login("100", "abc").unwrap();
        state.save_to(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("idInstance = \"100\""), "{text}");
        assert!(text.contains("apiTokenInstance = \"abc\""), "{text}");
    }

    #[test]
    fn login_requires_both_fields_and_logout_clears() {
        let mut state = AppState::new();
        assert_eq!(state.login(" ", "abc"), Err(ValidationError::MissingCredentials));
        state.login("100", "abc").unwrap();
        state.login("200", "xyz").unwrap();
        assert_eq!(state.credentials.as_ref().unwrap().instance_id, "200");

        let old = state.logout().unwrap();
        assert_eq!(old.access_token, "xyz");
        assert!(state.credentials.is_none());
    }

    #[test]
    fn api_url_is_normalized_and_validated() {
        let mut state = AppState::new();
        state.set_api_url("1103.api.greenapi.com/").unwrap();
        assert_eq!(state.api_url, "https://1103.api.greenapi.com");
        assert!(state.set_api_url("http://[bad").is_err());
    }
}
