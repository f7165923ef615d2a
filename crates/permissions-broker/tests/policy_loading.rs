use std::io::Write;

use permissions_broker::{
    load_policy_from_path, parse_policy_str, PermissionCheck, PermissionPolicy, PolicyPermissions,
};

#[test]
fn json_and_yaml_policies_parse() {
    let json = parse_policy_str(r#"{"allow_login": true}"#).unwrap();
    assert!(json.allow_login);
    assert!(!json.allow_upload);

    let yaml = parse_policy_str("allow_upload: true\nallow_off_allowlist: true\n").unwrap();
    assert_eq!(
        yaml,
        PermissionPolicy {
            allow_upload: true,
            allow_off_allowlist: true,
            ..Default::default()
        }
    );

    assert!(parse_policy_str("- not\n- a map").is_err());
}

#[test]
fn policy_file_drives_checks() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "allow_off_allowlist: true").unwrap();
    let policy = load_policy_from_path(file.path()).unwrap();
    let perms = PolicyPermissions::new(policy);
    assert!(perms.check("off-allowlist"));
    assert!(!perms.check("upload"));
}
