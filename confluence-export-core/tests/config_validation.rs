use confluence_export_core::client::Credentials;
use confluence_export_core::config::{ExportSettings, DEFAULT_PAGE_LIMIT};
use confluence_export_core::error::ExportError;

fn complete() -> ExportSettings {
    ExportSettings {
        base_url: Some("https://acme.atlassian.net/".to_string()),
        space_key: Some("DOCS".to_string()),
        username: Some("user".to_string()),
        access_token: Some("token".to_string()),
        cloud: true,
        process_attachments: true,
        ..Default::default()
    }
}

#[test]
fn complete_settings_validate() {
    let config = complete().validate().expect("valid");

    assert_eq!(config.base_url, "https://acme.atlassian.net");
    assert_eq!(config.space_key, "DOCS");
    assert_eq!(config.page_limit, DEFAULT_PAGE_LIMIT);
    assert_eq!(
        config.credentials,
        Credentials::Basic {
            username: "user".to_string(),
            token: "token".to_string()
        }
    );
}

#[test]
fn base_url_is_checked_first() {
    let settings = ExportSettings {
        base_url: None,
        space_key: None,
        username: None,
        access_token: None,
        ..complete()
    };
    assert!(matches!(settings.validate(), Err(ExportError::MissingBaseUrl)));
}

#[test]
fn credentials_are_checked_before_space_key() {
    let settings = ExportSettings {
        space_key: None,
        access_token: Some("   ".to_string()),
        ..complete()
    };
    assert!(matches!(
        settings.validate(),
        Err(ExportError::MissingCredentials)
    ));
}

#[test]
fn missing_space_key_is_reported() {
    let settings = ExportSettings {
        space_key: Some(String::new()),
        ..complete()
    };
    let err = settings.validate().unwrap_err();
    assert!(matches!(err, ExportError::MissingSpaceKey));
    assert!(err.to_string().contains("space key"));
}

#[test]
fn zero_page_limit_falls_back_to_default() {
    let settings = ExportSettings {
        page_limit: Some(0),
        max_pages: Some(10),
        ..complete()
    };
    let config = settings.validate().unwrap();
    assert_eq!(config.page_limit, DEFAULT_PAGE_LIMIT);
    assert_eq!(config.max_pages, Some(10));
}
