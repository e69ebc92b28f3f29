use confluence_export::load_config::{load_config, load_settings};
use confluence_export_core::client::Credentials;
use confluence_export_core::serialize::OutputFormat;
use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

const ENV_VARS: [&str; 5] = [
    "CONFLUENCE_BASE_URL",
    "CONFLUENCE_SPACE_KEY",
    "CONFLUENCE_USERNAME",
    "CONFLUENCE_ACCESS_TOKEN",
    "CONFLUENCE_PERSONAL_ACCESS_TOKEN",
];

fn clear_env() {
    for key in ENV_VARS {
        env::remove_var(key);
    }
}

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

/// A full config file plus a personal access token yields a Bearer config.
#[test]
#[serial]
fn test_load_config_full_file_with_pat() {
    clear_env();
    let file = config_file(
        r#"
confluence:
  base_url: "https://acme.atlassian.net/"
  space_key: DOCS
  cloud: false
export:
  output_dir: ./tmp/exports
  format: JSON
  process_attachments: false
  page_limit: 50
  max_pages: 200
"#,
    );
    env::set_var("CONFLUENCE_PERSONAL_ACCESS_TOKEN", "pat-123");
    env::set_var("CONFLUENCE_USERNAME", "user");
    env::set_var("CONFLUENCE_ACCESS_TOKEN", "token");

    let config = load_config(file.path()).expect("Config should load");

    assert_eq!(config.base_url, "https://acme.atlassian.net");
    assert_eq!(config.space_key, "DOCS");
    assert!(!config.cloud);
    assert_eq!(config.output_dir, PathBuf::from("./tmp/exports"));
    assert_eq!(config.output_format, OutputFormat::Json);
    assert!(!config.process_attachments);
    assert_eq!(config.page_limit, 50);
    assert_eq!(config.max_pages, Some(200));
    assert_eq!(
        config.credentials,
        Credentials::Bearer {
            token: "pat-123".to_string()
        }
    );
    clear_env();
}

/// Omitted keys take their defaults; connection details may come from the environment.
#[test]
#[serial]
fn test_load_config_defaults_and_env_fallbacks() {
    clear_env();
    let file = config_file("export:\n  format: md\n");
    env::set_var("CONFLUENCE_BASE_URL", "https://wiki.acme.internal");
    env::set_var("CONFLUENCE_SPACE_KEY", "ENG");
    env::set_var("CONFLUENCE_USERNAME", "user");
    env::set_var("CONFLUENCE_ACCESS_TOKEN", "token");

    let config = load_config(file.path()).expect("Config should load from env");

    assert_eq!(config.base_url, "https://wiki.acme.internal");
    assert_eq!(config.space_key, "ENG");
    assert!(config.cloud);
    assert!(config.process_attachments);
    assert_eq!(config.output_dir, PathBuf::from("./download"));
    assert_eq!(config.output_format, OutputFormat::Md);
    assert_eq!(config.page_limit, 25);
    assert_eq!(config.max_pages, None);
    assert!(matches!(config.credentials, Credentials::Basic { .. }));
    clear_env();
}

#[test]
#[serial]
fn test_load_settings_does_not_validate() {
    clear_env();
    let file = config_file("confluence:\n  space_key: DOCS\n");

    let settings = load_settings(file.path()).expect("Settings load without secrets");

    assert_eq!(settings.space_key.as_deref(), Some("DOCS"));
    assert_eq!(settings.base_url, None);
    assert_eq!(settings.personal_access_token, None);
}

#[test]
#[serial]
fn test_load_config_errors_on_missing_space_key() {
    clear_env();
    let file = config_file("confluence:\n  base_url: https://acme.atlassian.net\n");
    env::set_var("CONFLUENCE_PERSONAL_ACCESS_TOKEN", "pat");

    let err = load_config(file.path()).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("space key"), "got: {msg}");
    clear_env();
}

#[test]
#[serial]
fn test_load_config_errors_on_missing_credentials() {
    clear_env();
    let file = config_file(
        "confluence:\n  base_url: https://acme.atlassian.net\n  space_key: DOCS\n",
    );
    env::set_var("CONFLUENCE_USERNAME", "user-without-token");

    let err = load_config(file.path()).unwrap_err();
    let msg = format!("{err:#}");
    assert!(
        msg.contains("CONFLUENCE_PERSONAL_ACCESS_TOKEN"),
        "got: {msg}"
    );
    clear_env();
}

#[test]
#[serial]
fn test_load_config_errors_on_unknown_format() {
    clear_env();
    let file = config_file("export:\n  format: docx\n");

    let Err(err) = load_settings(file.path()) else {
        panic!("expected load_settings to fail");
    };
    assert!(
        err.to_string().contains("unsupported output format"),
        "got: {err}"
    );
}

/// This test ensures that if the config file is not valid YAML, loading errors and reports as such.
#[test]
#[serial]
fn test_load_config_errors_for_invalid_file() {
    clear_env();
    let file = config_file("not-yaml: [:::");

    let Err(err) = load_settings(file.path()) else {
        panic!("expected load_settings to fail");
    };
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}

#[test]
#[serial]
fn test_load_config_errors_for_missing_file() {
    let Err(err) = load_settings("/definitely/not/here.yaml") else {
        panic!("expected load_settings to fail");
    };
    assert!(err.to_string().contains("Failed to read config file"));
}
