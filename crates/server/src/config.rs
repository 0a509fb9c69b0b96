use std::path::Path;

use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    /// Recompute every item's review count from its active reviews before serving.
    pub reconcile_on_startup: bool,
    pub guest_reviewer_on_update: bool,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            database_url: "sqlite://./data/reviews.db".into(),
            reconcile_on_startup: true,
            guest_reviewer_on_update: true,
            max_body_bytes: 64 * 1024,
        }
    }
}

pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new("server.toml"))
}

/// Layers defaults, the optional TOML file at `path`, then `APP__*` variables.
///
/// `SERVER_BIND` and `DATABASE_URL` are honoured when their `APP__` counterpart is unset.
pub fn load_settings_from(path: &Path) -> anyhow::Result<Settings> {
    let defaults = Settings::default();
    let mut settings: Settings = Config::builder()
        .set_default("server_bind", defaults.server_bind)?
        .set_default("database_url", defaults.database_url)?
        .set_default("reconcile_on_startup", defaults.reconcile_on_startup)?
        .set_default("guest_reviewer_on_update", defaults.guest_reviewer_on_update)?
        .set_default("max_body_bytes", defaults.max_body_bytes as i64)?
        .add_source(File::from(path).format(FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("failed to read settings from '{}'", path.display()))?
        .try_deserialize()
        .context("invalid server settings")?;

    if std::env::var("APP__SERVER_BIND").is_err() {
        if let Ok(v) = std::env::var("SERVER_BIND") {
            settings.server_bind = v;
        }
    }
    if std::env::var("APP__DATABASE_URL").is_err() {
        if let Ok(v) = std::env::var("DATABASE_URL") {
            settings.database_url = v;
        }
    }

    settings.database_url = normalize_database_url(&settings.database_url);
    Ok(settings)
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
