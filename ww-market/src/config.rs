//! Configuration resolution for ww-market
//!
//! Settings resolve CLI/environment first (clap folds the two), then the
//! module TOML file, then compiled defaults.

use tracing::{info, warn};
use ww_common::config::{ClassifierConfig, CompiledDefaults, MarketplaceConfig, TomlConfig};
use ww_common::payment::Payee;
use ww_common::status::FeeSchedule;
use ww_common::Result;

/// Module name used for the TOML file and log lines
pub const MODULE_NAME: &str = "ww-market";

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Pick the Gemini API key: CLI/environment, then TOML
///
/// `None` disables the classification endpoints.
pub fn resolve_gemini_api_key(cli_or_env: Option<&str>, toml: &TomlConfig) -> Option<String> {
    let toml_key = toml.classifier.api_key.as_deref().filter(|k| is_valid_key(k));

    if let Some(key) = cli_or_env.filter(|k| is_valid_key(k)) {
        if toml_key.is_some() {
            warn!("Gemini API key found in both environment and TOML. Using environment.");
        }
        info!("Gemini API key loaded from command line or environment");
        return Some(key.to_string());
    }

    if let Some(key) = toml_key {
        info!("Gemini API key loaded from TOML config");
        return Some(key.to_string());
    }

    warn!(
        "Gemini API key not configured; classification endpoints are disabled. \
         Set WW_GEMINI_API_KEY or [classifier] api_key in ~/.config/wastewise/{}.toml",
        MODULE_NAME
    );
    None
}

/// Classifier settings with the resolved key applied
pub fn classifier_config(api_key: Option<String>, toml: &TomlConfig) -> ClassifierConfig {
    ClassifierConfig {
        api_key,
        ..toml.classifier.clone()
    }
}

/// Bind address and port: CLI/environment, then TOML, then defaults
pub fn resolve_listen_address(
    cli_bind: Option<String>,
    cli_port: Option<u16>,
    toml: &TomlConfig,
) -> (String, u16) {
    let defaults = CompiledDefaults::for_current_platform();
    let bind = cli_bind
        .or_else(|| toml.server.bind_address.clone())
        .unwrap_or(defaults.bind_address);
    let port = cli_port.or(toml.server.port).unwrap_or(defaults.port);
    (bind, port)
}

/// Validated fee schedule and payee from the marketplace section
pub fn marketplace_settings(config: &MarketplaceConfig) -> Result<(FeeSchedule, Payee)> {
    config.validate()?;
    let fees = FeeSchedule {
        collection_payment: config.collection_payment,
        service_fee: config.service_fee,
    };
    let payee = Payee {
        id: config.payee_id.clone(),
        name: config.payee_name.clone(),
        currency: config.currency.clone(),
    };
    Ok((fees, payee))
}
