use std::fs;

use super::*;

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
}

#[test]
fn keeps_full_urls_and_memory_databases() {
    assert_eq!(
        normalize_database_url("sqlite://./data/reviews.db"),
        "sqlite://./data/reviews.db"
    );
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
}

#[test]
fn single_colon_sqlite_url_gains_slashes() {
    assert_eq!(
        normalize_database_url("sqlite:data\\reviews.db"),
        "sqlite://data/reviews.db"
    );
}

#[test]
fn blank_database_url_falls_back_to_default() {
    assert_eq!(
        normalize_database_url("   "),
        Settings::default().database_url
    );
}

#[test]
fn missing_settings_file_yields_defaults() {
    let temp_root = tempfile::tempdir().expect("temp dir");
    let settings = load_settings_from(&temp_root.path().join("absent.toml")).expect("settings");
    let defaults = Settings::default();

    assert_eq!(settings.reconcile_on_startup, defaults.reconcile_on_startup);
    assert_eq!(
        settings.guest_reviewer_on_update,
        defaults.guest_reviewer_on_update
    );
    assert_eq!(settings.max_body_bytes, defaults.max_body_bytes);
}

#[test]
fn settings_file_overrides_defaults() {
    let temp_root = tempfile::tempdir().expect("temp dir");
    let path = temp_root.path().join("server.toml");
    fs::write(
        &path,
        "guest_reviewer_on_update = false\nreconcile_on_startup = false\nmax_body_bytes = 1024\n",
    )
    .expect("write settings");

    let settings = load_settings_from(&path).expect("settings");
    assert!(!settings.guest_reviewer_on_update);
    assert!(!settings.reconcile_on_startup);
    assert_eq!(settings.max_body_bytes, 1024);
}

#[test]
fn malformed_settings_file_is_an_error() {
    let temp_root = tempfile::tempdir().expect("temp dir");
    let path = temp_root.path().join("server.toml");
    fs::write(&path, "max_body_bytes = \"lots\"\n").expect("write settings");

    assert!(load_settings_from(&path).is_err());
}
