//! Configuration loading and root folder resolution
//!
//! Priority order for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file (`~/.config/wastewise/<module>.toml`)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal: a warning is logged and
//! the compiled defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "wastewise.db";

/// Compiled-in defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub bind_address: String,
    pub port: u16,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = dirs::data_local_dir()
            .map(|d| d.join("wastewise"))
            .unwrap_or_else(|| PathBuf::from("./wastewise_data"));

        Self {
            root_folder,
            log_level: "info".to_string(),
            bind_address: "127.0.0.1".to_string(),
            port: 5740,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
}

/// Hosted generative model used for image classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_requests_per_minute() -> u32 {
    30
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            endpoint: default_endpoint(),
            requests_per_minute: default_requests_per_minute(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Fees and payee details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    #[serde(default = "default_collection_payment")]
    pub collection_payment: f64,
    #[serde(default = "default_service_fee")]
    pub service_fee: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_payee_id")]
    pub payee_id: String,
    #[serde(default = "default_payee_name")]
    pub payee_name: String,
}

fn default_collection_payment() -> f64 {
    500.0
}

fn default_service_fee() -> f64 {
    20.0
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_payee_id() -> String {
    "wastewise@upi".to_string()
}

fn default_payee_name() -> String {
    "WasteWise".to_string()
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            collection_payment: default_collection_payment(),
            service_fee: default_service_fee(),
            currency: default_currency(),
            payee_id: default_payee_id(),
            payee_name: default_payee_name(),
        }
    }
}

impl MarketplaceConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("collection_payment", self.collection_payment),
            ("service_fee", self.service_fee),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!(
                    "marketplace.{} must be a non-negative amount, got {}",
                    name, value
                )));
            }
        }
        if self.currency.trim().is_empty() {
            return Err(Error::Config("marketplace.currency is empty".to_string()));
        }
        Ok(())
    }
}

/// Contents of a module TOML file; every section is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub marketplace: MarketplaceConfig,
}

impl TomlConfig {
    /// Load and parse a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Load the module's TOML file, falling back to defaults on any problem
    pub fn load_or_default(module_name: &str) -> Self {
        let Some(path) = config_file_path(module_name) else {
            warn!("Could not determine config directory; using defaults");
            return Self::default();
        };
        if !path.exists() {
            debug!("No config file at {}; using defaults", path.display());
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }
}

/// `~/.config/wastewise/<module>.toml` (platform config dir)
pub fn config_file_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wastewise").join(format!("{}.toml", module_name)))
}

/// Resolves the root folder holding the database
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml: Option<TomlConfig>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            toml: None,
        }
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Use an already loaded TOML file instead of reading the module's own
    pub fn with_toml(mut self, toml: TomlConfig) -> Self {
        self.toml = Some(toml);
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        // WW_ROOT_FOLDER takes precedence over WW_ROOT
        for var in ["WW_ROOT_FOLDER", "WW_ROOT"] {
            if let Ok(path) = std::env::var(var) {
                if !path.trim().is_empty() {
                    return PathBuf::from(path);
                }
            }
        }

        let toml_root = match &self.toml {
            Some(toml) => toml.root_folder.clone(),
            None => TomlConfig::load_or_default(&self.module_name).root_folder,
        };
        if let Some(path) = toml_root {
            return path;
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder and locates files within it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }
}
