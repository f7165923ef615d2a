use std::fs;

use serial_test::serial;
use webpilot_cli::config::{load_config, load_config_with_vars, ConfigError, DriverKind, LoadOptions};

fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn layers_apply_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("webpilot.yaml");
    fs::write(
        &path,
        "security:\n  allowed_domains: [file.test]\n  rate_limit_per_min: 10\npool:\n  browsers: 1\nbrowser:\n  driver: stub\n",
    )
    .unwrap();
    let options = LoadOptions {
        path: Some(path.clone()),
        include_env: true,
    };

    let loaded = load_config_with_vars(
        &options,
        vars(&[
            ("WEBPILOT__SECURITY__RATE_LIMIT_PER_MIN", "20"),
            ("WEBPILOT__ORCHESTRATOR__MAX_REPLANS", "5"),
            ("ALLOWED_DOMAINS", "a.test, b.test"),
            ("ALLOW_UPLOAD", "true"),
            ("OPENAI_API_KEY", "12345"),
            ("UNRELATED", "x"),
        ]),
    )
    .unwrap();

    let cfg = loaded.config;
    assert_eq!(loaded.path, Some(path));
    assert_eq!(cfg.security.allowed_domains, vec!["a.test", "b.test"]);
    assert_eq!(cfg.security.rate_limit_per_min, 20);
    assert_eq!(cfg.pool.browsers, 1);
    assert_eq!(cfg.pool.pages_per_browser, 4);
    assert_eq!(cfg.orchestrator.max_replans, 5);
    assert!(cfg.permissions.allow_upload);
    assert!(!cfg.permissions.allow_login);
    assert_eq!(cfg.planner.api_key.as_deref(), Some("12345"));
    assert_eq!(cfg.browser.driver, DriverKind::Stub);
}

#[test]
fn legacy_flags_accept_shell_style_values() {
    let options = LoadOptions {
        path: None,
        include_env: true,
    };
    let cfg = load_config_with_vars(&options, vars(&[("ALLOW_LOGIN", "1"), ("ALLOW_UPLOAD", "yes")]))
        .unwrap()
        .config;
    assert!(cfg.permissions.allow_login);
    assert!(cfg.permissions.allow_upload);

    let cfg = load_config_with_vars(
        &options,
        vars(&[("ALLOW_LOGIN", "0"), ("WEBPILOT__PERMISSIONS__ALLOW_UPLOAD", "no")]),
    )
    .unwrap()
    .config;
    assert!(!cfg.permissions.allow_login);
    assert!(!cfg.permissions.allow_upload);
}

#[test]
fn env_can_be_ignored() {
    let loaded = load_config_with_vars(
        &LoadOptions {
            path: None,
            include_env: false,
        },
        vars(&[("WEBPILOT__POOL__BROWSERS", "9")]),
    )
    .unwrap();
    assert_eq!(loaded.config.pool.browsers, 2);
}

#[test]
fn broken_files_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    fs::write(&path, "pool: [unclosed").unwrap();
    let err = load_config_with_vars(
        &LoadOptions {
            path: Some(path),
            include_env: false,
        },
        Vec::new(),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));

    let missing = load_config_with_vars(
        &LoadOptions {
            path: Some(dir.path().join("absent.yaml")),
            include_env: false,
        },
        Vec::new(),
    )
    .unwrap_err();
    assert!(matches!(missing, ConfigError::Io { .. }));
}

#[test]
fn mistyped_values_are_invalid() {
    let err = load_config_with_vars(
        &LoadOptions {
            path: None,
            include_env: true,
        },
        vars(&[("WEBPILOT__POOL__BROWSERS", "many")]),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
#[serial]
fn process_environment_is_read() {
    std::env::set_var("WEBPILOT__POOL__PAGES_PER_BROWSER", "7");
    std::env::set_var("OPENAI_MODEL", "gpt-test");
    let loaded = load_config(&LoadOptions {
        path: None,
        include_env: true,
    });
    std::env::remove_var("WEBPILOT__POOL__PAGES_PER_BROWSER");
    std::env::remove_var("OPENAI_MODEL");

    let cfg = loaded.unwrap().config;
    assert_eq!(cfg.pool.pages_per_browser, 7);
    assert_eq!(cfg.planner.model, "gpt-test");
}
