use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use tracing::warn;

const SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionSource {
    Builtin,
    Database,
}

impl FromStr for QuestionSource {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "builtin" => Ok(QuestionSource::Builtin),
            "database" | "db" => Ok(QuestionSource::Database),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub question_source: QuestionSource,
    pub record_sessions: bool,
    pub allow_answers_after_reveal: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "0.0.0.0:5000".into(),
            database_url: "sqlite://./data/tablero.db".into(),
            question_source: QuestionSource::Builtin,
            record_sessions: false,
            allow_answers_after_reveal: true,
        }
    }
}

pub fn load_settings() -> Settings {
    let file_cfg = fs::read_to_string(SETTINGS_FILE)
        .ok()
        .and_then(|raw| match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(cfg) => Some(cfg),
            Err(error) => {
                warn!(file = SETTINGS_FILE, %error, "ignoring unreadable settings file");
                None
            }
        })
        .unwrap_or_default();

    resolve_settings(&file_cfg, |key| std::env::var(key).ok())
}

/// Layers the settings file, then environment variables, over the defaults.
/// Later keys in each list win.
pub(crate) fn resolve_settings(
    file_cfg: &HashMap<String, String>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();
    let lookup = |file_key: &str, env_keys: &[&str]| -> Option<String> {
        env_keys
            .iter()
            .rev()
            .find_map(|key| env(key))
            .or_else(|| file_cfg.get(file_key).cloned())
    };

    if let Some(v) = lookup("bind_addr", &["SERVER_BIND", "APP__BIND_ADDR"]) {
        settings.server_bind = v;
    }
    if let Some(v) = lookup("database_url", &["DATABASE_URL", "APP__DATABASE_URL"]) {
        settings.database_url = v;
    }
    if let Some(v) = lookup("question_source", &["APP__QUESTION_SOURCE"]) {
        match v.parse() {
            Ok(source) => settings.question_source = source,
            Err(()) => warn!(value = %v, "unknown question source, keeping default"),
        }
    }
    if let Some(v) = lookup("record_sessions", &["APP__RECORD_SESSIONS"]) {
        match parse_flag(&v) {
            Some(flag) => settings.record_sessions = flag,
            None => warn!(value = %v, "invalid record_sessions flag, keeping default"),
        }
    }
    if let Some(v) = lookup(
        "allow_answers_after_reveal",
        &["APP__ALLOW_ANSWERS_AFTER_REVEAL"],
    ) {
        match parse_flag(&v) {
            Some(flag) => settings.allow_answers_after_reveal = flag,
            None => warn!(value = %v, "invalid allow_answers_after_reveal flag, keeping default"),
        }
    }

    settings
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

pub(crate) fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        if has_drive_prefix(path) {
            return format!("sqlite:{}", path.replace('\\', "/"));
        }
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        if has_drive_prefix(&path) {
            return format!("sqlite:{path}");
        }
        return format!("sqlite://{path}");
    }

    if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    let path = raw_database_url.replace('\\', "/");
    if has_drive_prefix(&path) {
        return format!("sqlite:{path}");
    }
    format!("sqlite://{path}")
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
