//! Configuration loading for studentdesk
//!
//! Configuration is layered (highest precedence first):
//! 1. Environment variables prefixed with `STUDENTDESK__`, using `__` between
//!    sections and keys (e.g. `STUDENTDESK__STORE__URL`)
//! 2. A TOML file (`--config`, or `~/.config/studentdesk/config.toml`)
//! 3. Built-in defaults
//!
//! The hosted-service variables used by earlier deployments (`SUPABASE_URL`,
//! `SUPABASE_ANON_KEY`, `GEMINI_API_KEY`, `API_KEY`) fill any credential that
//! is still empty after layering.

use crate::error::{PortalError, Result};
use crate::services::LlmConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

const ENV_PREFIX: &str = "STUDENTDESK";
const CONFIG_DIR_NAME: &str = "studentdesk";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Complete portal configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub llm: LlmConfig,
    pub portal: PortalSettings,
}

/// HTTP API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub addr: String,
    /// Capacity of the live event channel
    pub event_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3000".to_string(),
            event_capacity: 1000,
        }
    }
}

/// Hosted relational store (PostgREST endpoint) settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Project URL, e.g. `https://<ref>.supabase.co`
    pub url: String,
    /// Anonymous API key
    pub api_key: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            timeout_secs: 30,
        }
    }
}

impl StoreConfig {
    /// Both the URL and the key are present
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.api_key.trim().is_empty()
    }
}

/// Organisation-specific wording and the demo administrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalSettings {
    /// Faculty name used in assistant prompts
    pub organization: String,
    /// City printed on the date line of exported documents
    pub city: String,
    /// Domain used to derive student email addresses
    pub student_email_domain: String,
    pub builtin_admin: BuiltinAdmin,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            organization: "Khoa Công nghệ Thông tin".to_string(),
            city: "Hà Nội".to_string(),
            student_email_domain: "st.vlute.edu.vn".to_string(),
            builtin_admin: BuiltinAdmin::default(),
        }
    }
}

/// Administrator account that works without any store row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuiltinAdmin {
    pub enabled: bool,
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub email: String,
}

impl Default for BuiltinAdmin {
    fn default() -> Self {
        Self {
            enabled: true,
            username: "admin".to_string(),
            password: "admin".to_string(),
            display_name: "Quản trị viên".to_string(),
            email: "admin@fit.edu.vn".to_string(),
        }
    }
}

/// Default config file location under the user's config directory
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

impl PortalConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                debug!("Loading config file {}", path.display());
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(default_path) = default_config_path() {
                    builder =
                        builder.add_source(config::File::from(default_path).required(false));
                }
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let mut config: PortalConfig = builder.build()?.try_deserialize()?;
        config.apply_legacy_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (no environment layering)
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: PortalConfig = config::Config::builder()
            .add_source(config::File::from_str(toml_str, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_legacy_env(&mut self) {
        fill_from_env(&mut self.store.url, &["SUPABASE_URL"]);
        fill_from_env(&mut self.store.api_key, &["SUPABASE_ANON_KEY"]);
        fill_from_env(&mut self.llm.api_key, &["GEMINI_API_KEY", "API_KEY"]);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.addr.trim().is_empty() {
            return Err(PortalError::Config("server.addr must not be empty".to_string()));
        }
        if self.server.event_capacity == 0 {
            return Err(PortalError::Config(
                "server.event_capacity must be at least 1".to_string(),
            ));
        }
        if self.store.timeout_secs == 0 || self.llm.timeout_secs == 0 {
            return Err(PortalError::Config("timeouts must be at least 1 second".to_string()));
        }
        for (name, value) in [
            ("llm.chat_temperature", self.llm.chat_temperature),
            ("llm.analysis_temperature", self.llm.analysis_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(PortalError::Config(format!(
                    "{} must be between 0.0 and 2.0",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Copy of the configuration with credentials masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.store.api_key = mask(&copy.store.api_key);
        copy.llm.api_key = mask(&copy.llm.api_key);
        copy.portal.builtin_admin.password = mask(&copy.portal.builtin_admin.password);
        copy
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| PortalError::Config(e.to_string()))
    }

    /// Write the configuration as TOML, creating parent directories
    pub fn to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}

fn fill_from_env(target: &mut String, vars: &[&str]) {
    if !target.trim().is_empty() {
        return;
    }
    if let Some(value) = vars
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|value| !value.is_empty())
    {
        *target = value;
    }
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{}…", visible)
}
