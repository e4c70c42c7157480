//! Configuration resolution and TOML parsing tests
//!
//! Tests that manipulate WW_ROOT_FOLDER or WW_ROOT are marked with #[serial]
//! so they never race each other on the process environment.

use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use ww_common::config::{
    CompiledDefaults, MarketplaceConfig, RootFolderInitializer, RootFolderResolver, TomlConfig,
    DATABASE_FILE,
};

fn clear_root_env() {
    env::remove_var("WW_ROOT_FOLDER");
    env::remove_var("WW_ROOT");
}

#[test]
fn test_compiled_defaults() {
    let defaults = CompiledDefaults::for_current_platform();
    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert!(defaults.root_folder.to_string_lossy().contains("wastewise"));
    assert_eq!(defaults.log_level, "info");
    assert_eq!(defaults.port, 5740);
}

#[test]
#[serial]
fn test_resolver_cli_arg_wins() {
    env::set_var("WW_ROOT_FOLDER", "/tmp/ww-env");
    let resolver = RootFolderResolver::new("test-module")
        .with_cli_arg(Some(PathBuf::from("/tmp/ww-cli")))
        .with_toml(TomlConfig::default());
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/ww-cli"));
    clear_root_env();
}

#[test]
#[serial]
fn test_resolver_env_priority() {
    clear_root_env();
    env::set_var("WW_ROOT_FOLDER", "/tmp/ww-priority-1");
    env::set_var("WW_ROOT", "/tmp/ww-priority-2");

    let resolver = RootFolderResolver::new("test-module").with_toml(TomlConfig::default());
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/ww-priority-1"));

    env::remove_var("WW_ROOT_FOLDER");
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/ww-priority-2"));
    clear_root_env();
}

#[test]
#[serial]
fn test_resolver_toml_then_default() {
    clear_root_env();
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/ww-toml")),
        ..TomlConfig::default()
    };
    let resolver = RootFolderResolver::new("test-module").with_toml(toml);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/ww-toml"));

    let resolver = RootFolderResolver::new("test-module").with_toml(TomlConfig::default());
    assert_eq!(
        resolver.resolve(),
        CompiledDefaults::for_current_platform().root_folder
    );
}

#[test]
fn test_initializer_creates_directory() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("nested").join("root");
    let initializer = RootFolderInitializer::new(root.clone());

    initializer.ensure_directory_exists().unwrap();
    assert!(root.is_dir());
    assert_eq!(initializer.database_path(), root.join(DATABASE_FILE));
}

#[test]
fn test_toml_partial_sections_use_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
root_folder = "/srv/wastewise"

[classifier]
api_key = "secret"

[marketplace]
service_fee = 1.5
"#
    )
    .unwrap();

    let config = TomlConfig::load(file.path()).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/wastewise")));
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.classifier.api_key.as_deref(), Some("secret"));
    assert_eq!(config.classifier.model, "gemini-2.5-flash");
    assert_eq!(config.marketplace.service_fee, 1.5);
    assert_eq!(config.marketplace.collection_payment, 500.0);
    assert_eq!(config.marketplace.currency, "INR");
    assert_eq!(config.server.port, None);
}

#[test]
fn test_toml_parse_error_is_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "root_folder = [not toml").unwrap();
    let err = TomlConfig::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("Configuration error"));
}

#[test]
fn test_marketplace_validation() {
    assert!(MarketplaceConfig::default().validate().is_ok());

    let negative = MarketplaceConfig {
        service_fee: -1.0,
        ..MarketplaceConfig::default()
    };
    assert!(negative.validate().is_err());

    let no_currency = MarketplaceConfig {
        currency: " ".to_string(),
        ..MarketplaceConfig::default()
    };
    assert!(no_currency.validate().is_err());
}
