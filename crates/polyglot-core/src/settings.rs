//! User settings: provider, model, API keys and the execution service.
//!
//! Settings live in a TOML file under the Polyglot home directory
//! (`$POLYGLOT_HOME`, default `~/.polyglot`). Keys found in the environment
//! take precedence over the file but are never written back to it.
//!
//! Components receive a [`SettingsHandle`] instead of reading settings on
//! their own; the handle persists changes and notifies subscribers.

use polyglot_models::ProviderKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

/// Default Judge0 endpoint (RapidAPI-hosted community edition).
pub const DEFAULT_JUDGE0_URL: &str = "https://judge0-ce.p.rapidapi.com";
const DEFAULT_JUDGE0_HOST: &str = "judge0-ce.p.rapidapi.com";

const SETTINGS_FILE: &str = "settings.toml";
const JUDGE0_KEY_VAR: &str = "JUDGE0_API_KEY";

/// Errors raised while loading or changing settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("Failed to read settings file: {0}")]
    Read(String),

    /// The settings file is not valid TOML for [`Settings`].
    #[error("Failed to parse settings file: {0}")]
    Parse(String),

    /// The settings file could not be written.
    #[error("Failed to write settings file: {0}")]
    Write(String),

    /// A value was rejected.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}

/// Result type for settings operations.
pub type SettingsResult<T> = std::result::Result<T, SettingsError>;

/// Per-provider API keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<String>,
}

impl ApiKeys {
    /// The key stored for `provider`, ignoring blank values.
    pub fn get(&self, provider: ProviderKind) -> Option<&str> {
        let key = match provider {
            ProviderKind::OpenAI => self.openai.as_deref(),
            ProviderKind::Gemini => self.gemini.as_deref(),
            ProviderKind::Anthropic => self.anthropic.as_deref(),
            ProviderKind::Mock => None,
        };
        key.filter(|k| !k.trim().is_empty())
    }

    fn slot_mut(&mut self, provider: ProviderKind) -> Option<&mut Option<String>> {
        match provider {
            ProviderKind::OpenAI => Some(&mut self.openai),
            ProviderKind::Gemini => Some(&mut self.gemini),
            ProviderKind::Anthropic => Some(&mut self.anthropic),
            ProviderKind::Mock => None,
        }
    }
}

/// Remote execution service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Judge0Settings {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Value of the `X-RapidAPI-Host` header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl Default for Judge0Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_JUDGE0_URL.to_string(),
            api_key: None,
            host: Some(DEFAULT_JUDGE0_HOST.to_string()),
        }
    }
}

/// Values picked up from the environment on load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct EnvOverrides {
    api_keys: ApiKeys,
    judge0_api_key: Option<String>,
}

/// User settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub provider: ProviderKind,
    pub model: String,
    /// Log filter used when no `--log-level` flag is given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    pub api_keys: ApiKeys,
    pub judge0: Judge0Settings,
    #[serde(skip)]
    env: EnvOverrides,
}

impl Default for Settings {
    fn default() -> Self {
        let provider = ProviderKind::default();
        Self {
            provider,
            model: provider.default_model().to_string(),
            log_level: None,
            api_keys: ApiKeys::default(),
            judge0: Judge0Settings::default(),
            env: EnvOverrides::default(),
        }
    }
}

impl Settings {
    /// Selects a provider and resets the model to that provider's default.
    pub fn set_provider(&mut self, provider: ProviderKind) {
        self.provider = provider;
        self.model = provider.default_model().to_string();
    }

    /// Selects a model from the current provider's catalog.
    pub fn set_model(&mut self, model: &str) -> SettingsResult<()> {
        let model = model.trim();
        if !self.provider.catalog().iter().any(|info| info.id == model) {
            return Err(SettingsError::InvalidValue(format!(
                "model '{}' is not offered by {}",
                model, self.provider
            )));
        }
        self.model = model.to_string();
        Ok(())
    }

    /// Stores (or, with a blank key, clears) the key for `provider`.
    pub fn set_api_key(&mut self, provider: ProviderKind, key: &str) -> SettingsResult<()> {
        let slot = self.api_keys.slot_mut(provider).ok_or_else(|| {
            SettingsError::InvalidValue(format!("{} does not use an API key", provider))
        })?;
        let key = key.trim();
        *slot = if key.is_empty() { None } else { Some(key.to_string()) };
        Ok(())
    }

    /// The key for `provider`: environment first, then the settings file.
    pub fn api_key_for(&self, provider: ProviderKind) -> Option<&str> {
        self.env.api_keys.get(provider).or_else(|| self.api_keys.get(provider))
    }

    /// The key for the selected provider.
    ///
    /// Keys of other providers are never used as a substitute.
    pub fn active_api_key(&self) -> Option<&str> {
        self.api_key_for(self.provider)
    }

    /// The Judge0 key: environment first, then the settings file.
    pub fn judge0_api_key(&self) -> Option<&str> {
        self.env
            .judge0_api_key
            .as_deref()
            .or(self.judge0.api_key.as_deref())
            .filter(|k| !k.trim().is_empty())
    }

    /// Records keys found through `lookup` as overrides.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        for provider in ProviderKind::ALL {
            if let (Some(var), Some(slot)) = (provider.env_var(), self.env.api_keys.slot_mut(provider))
            {
                *slot = non_empty(var);
            }
        }
        self.env.judge0_api_key = non_empty(JUDGE0_KEY_VAR);
    }
}

/// Reads and writes the settings file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// A store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A store in the default location.
    pub fn open_default() -> Self {
        Self::new(Self::default_path())
    }

    /// `$POLYGLOT_HOME/settings.toml`, falling back to `~/.polyglot/settings.toml`.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join(SETTINGS_FILE)
    }

    fn home_dir() -> PathBuf {
        if let Some(home) = std::env::var_os("POLYGLOT_HOME").filter(|v| !v.is_empty()) {
            return PathBuf::from(home);
        }
        std::env::var_os("HOME").map_or_else(|| PathBuf::from("."), PathBuf::from).join(".polyglot")
    }

    /// Path of the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads settings, applying overrides from the process environment.
    pub fn load(&self) -> SettingsResult<Settings> {
        self.load_with_env(|name| std::env::var(name).ok())
    }

    /// Loads settings, applying overrides from `lookup`.
    ///
    /// A missing file yields the defaults.
    pub fn load_with_env(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> SettingsResult<Settings> {
        let mut settings = if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)
                .map_err(|e| SettingsError::Read(format!("{}: {}", self.path.display(), e)))?;
            toml::from_str(&content)
                .map_err(|e| SettingsError::Parse(format!("{}: {}", self.path.display(), e)))?
        } else {
            debug!(path = %self.path.display(), "No settings file, using defaults");
            Settings::default()
        };

        settings.apply_env_overrides(lookup);
        Ok(settings)
    }

    /// Writes `settings`, creating the parent directory when needed.
    ///
    /// The file holds API keys, so on Unix it is made readable by the owner
    /// only (0600) and its directory gets 0700.
    pub fn save(&self, settings: &Settings) -> SettingsResult<()> {
        let content = toml::to_string_pretty(settings)
            .map_err(|e| SettingsError::Write(format!("Failed to serialize: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| SettingsError::Write(format!("Failed to create directory: {}", e)))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = std::fs::Permissions::from_mode(0o700);
                std::fs::set_permissions(parent, perms).map_err(|e| {
                    SettingsError::Write(format!("Failed to set permissions on {}: {}", parent.display(), e))
                })?;
            }
        }

        std::fs::write(&self.path, content)
            .map_err(|e| SettingsError::Write(format!("{}: {}", self.path.display(), e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms).map_err(|e| {
                SettingsError::Write(format!("Failed to set permissions on {}: {}", self.path.display(), e))
            })?;
        }

        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}

/// Shared, observable settings.
///
/// Cloning the handle shares the same state.
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    store: SettingsStore,
    current: Arc<RwLock<Settings>>,
    notify: Arc<watch::Sender<Settings>>,
}

impl SettingsHandle {
    /// Loads settings from `store` and wraps them in a handle.
    pub fn open(store: SettingsStore) -> SettingsResult<Self> {
        let settings = store.load()?;
        Ok(Self::with_settings(store, settings))
    }

    /// Wraps already loaded settings.
    pub fn with_settings(store: SettingsStore, settings: Settings) -> Self {
        let (notify, _) = watch::channel(settings.clone());
        Self { store, current: Arc::new(RwLock::new(settings)), notify: Arc::new(notify) }
    }

    /// The store this handle persists to.
    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    /// A snapshot of the current settings.
    pub fn current(&self) -> Settings {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Persists `settings` and makes them current.
    pub fn save(&self, settings: Settings) -> SettingsResult<()> {
        self.store.save(&settings)?;
        self.replace(settings);
        Ok(())
    }

    /// Applies `change` to a copy of the current settings and saves the result.
    pub fn update(
        &self,
        change: impl FnOnce(&mut Settings) -> SettingsResult<()>,
    ) -> SettingsResult<Settings> {
        let mut settings = self.current();
        change(&mut settings)?;
        self.save(settings.clone())?;
        Ok(settings)
    }

    /// Re-reads the settings file and makes the result current.
    pub fn reload(&self) -> SettingsResult<Settings> {
        let settings = self.store.load()?;
        self.replace(settings.clone());
        Ok(settings)
    }

    /// A receiver that observes every save and reload.
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.notify.subscribe()
    }

    fn replace(&self, settings: Settings) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = settings.clone();
        self.notify.send_replace(settings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join("home").join(SETTINGS_FILE))
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = TempDir::new().unwrap();
        let settings = store_in(&dir).load_with_env(no_env).unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.provider, ProviderKind::OpenAI);
        assert_eq!(settings.model, "gpt-4");
        assert_eq!(settings.judge0.base_url, DEFAULT_JUDGE0_URL);
        assert!(settings.active_api_key().is_none());
        assert!(settings.judge0_api_key().is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut settings = Settings::default();
        settings.set_provider(ProviderKind::Gemini);
        settings.set_model("gemini-1.5-pro").unwrap();
        settings.set_api_key(ProviderKind::Gemini, "g-key").unwrap();
        settings.judge0.api_key = Some("j-key".to_string());
        store.save(&settings).unwrap();

        let loaded = store.load_with_env(no_env).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.active_api_key(), Some("g-key"));
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut settings = Settings::default();
        settings.set_api_key(ProviderKind::OpenAI, "sk-secret").unwrap();
        store.save(&settings).unwrap();

        let file_mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(file_mode & 0o077, 0, "settings file mode {:o}", file_mode);
        let dir_mode = std::fs::metadata(dir.path().join("home")).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o077, 0, "settings dir mode {:o}", dir_mode);

        // A file left world-readable by an older save is tightened too.
        std::fs::set_permissions(store.path(), std::fs::Permissions::from_mode(0o644)).unwrap();
        store.save(&settings).unwrap();
        let file_mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(file_mode & 0o077, 0);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "provider = \"claude\"\nmodel = \"claude-3-haiku\"\n").unwrap();

        let settings = SettingsStore::new(&path).load_with_env(no_env).unwrap();
        assert_eq!(settings.provider, ProviderKind::Anthropic);
        assert_eq!(settings.model, "claude-3-haiku");
        assert_eq!(settings.judge0, Judge0Settings::default());
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "provider = \"nonexistent\"").unwrap();

        let err = SettingsStore::new(&path).load_with_env(no_env).unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn test_provider_switch_resets_model() {
        let mut settings = Settings::default();
        settings.set_model("gpt-3.5-turbo").unwrap();
        settings.set_provider(ProviderKind::Anthropic);
        assert_eq!(settings.model, "claude-3-opus");
    }

    #[test]
    fn test_set_model_outside_catalog() {
        let mut settings = Settings::default();
        let err = settings.set_model("gemini-pro").unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue(_)));
        assert_eq!(settings.model, "gpt-4");
    }

    #[test]
    fn test_active_key_is_per_provider() {
        let mut settings = Settings::default();
        settings.set_api_key(ProviderKind::Gemini, "g-key").unwrap();

        // OpenAI is selected: the Gemini key must not be used.
        assert_eq!(settings.active_api_key(), None);
        settings.set_provider(ProviderKind::Gemini);
        assert_eq!(settings.active_api_key(), Some("g-key"));

        settings.set_api_key(ProviderKind::Gemini, "   ").unwrap();
        assert_eq!(settings.active_api_key(), None);
        assert!(settings.set_api_key(ProviderKind::Mock, "x").is_err());
    }

    #[test]
    fn test_env_overrides_win_and_are_not_saved() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut settings = Settings::default();
        settings.set_api_key(ProviderKind::OpenAI, "file-key").unwrap();
        store.save(&settings).unwrap();

        let env = |name: &str| match name {
            "OPENAI_API_KEY" => Some("env-key".to_string()),
            "JUDGE0_API_KEY" => Some("env-judge0".to_string()),
            "GEMINI_API_KEY" => Some(String::new()),
            _ => None,
        };
        let loaded = store.load_with_env(env).unwrap();
        assert_eq!(loaded.active_api_key(), Some("env-key"));
        assert_eq!(loaded.judge0_api_key(), Some("env-judge0"));
        assert_eq!(loaded.api_key_for(ProviderKind::Gemini), None);

        store.save(&loaded).unwrap();
        let written = std::fs::read_to_string(store.path()).unwrap();
        assert!(written.contains("file-key"));
        assert!(!written.contains("env-key"));
        assert!(!written.contains("env-judge0"));
    }

    #[tokio::test]
    async fn test_handle_save_notifies_subscribers() {
        let dir = TempDir::new().unwrap();
        let handle = SettingsHandle::with_settings(store_in(&dir), Settings::default());
        let mut rx = handle.subscribe();

        handle
            .update(|s| {
                s.set_provider(ProviderKind::Mock);
                Ok(())
            })
            .unwrap();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().provider, ProviderKind::Mock);
        assert_eq!(handle.current().model, "mock");
        assert!(handle.store().path().exists());
    }

    #[tokio::test]
    async fn test_handle_reload_picks_up_external_changes() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let handle = SettingsHandle::with_settings(store.clone(), Settings::default());
        let mut rx = handle.subscribe();

        let mut external = Settings::default();
        external.set_provider(ProviderKind::Gemini);
        store.save(&external).unwrap();

        let reloaded = handle.reload().unwrap();
        assert_eq!(reloaded.provider, ProviderKind::Gemini);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().model, "gemini-2.5-flash");
        assert_eq!(handle.current().provider, ProviderKind::Gemini);
    }

    #[test]
    fn test_failed_update_leaves_state_untouched() {
        let dir = TempDir::new().unwrap();
        let handle = SettingsHandle::with_settings(store_in(&dir), Settings::default());

        let result = handle.update(|s| s.set_model("not-a-model"));
        assert!(result.is_err());
        assert_eq!(handle.current(), Settings::default());
        assert!(!handle.store().path().exists());
    }
}
