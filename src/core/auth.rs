use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Keys issued by the service carry this prefix; anything else found in
/// shared config files belongs to some other provider.
const KEY_PREFIX: &str = "88_";
const ENV_VARS: [&str; 3] = ["key88", "ANTHROPIC_AUTH_TOKEN", "OPENAI_API_KEY"];

pub fn is_service_key(key: &str) -> bool {
    key.starts_with(KEY_PREFIX)
}

// --- Codex auth file ---

#[derive(Deserialize)]
struct CodexAuthFile {
    #[serde(rename = "OPENAI_API_KEY")]
    openai_api_key: Option<String>,
}

fn codex_auth_path() -> PathBuf {
    std::env::var("CODEX_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join(".codex")
        })
        .join("auth.json")
}

/// Read the key from a Codex `auth.json`.
pub fn read_codex_key(path: &Path) -> Result<Option<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file: CodexAuthFile =
        serde_json::from_str(&content).with_context(|| "Failed to parse Codex auth JSON")?;
    Ok(file.openai_api_key.filter(|k| is_service_key(k)))
}

// --- Claude settings file ---

#[derive(Deserialize)]
struct ClaudeSettingsFile {
    env: Option<ClaudeSettingsEnv>,
}

#[derive(Deserialize)]
struct ClaudeSettingsEnv {
    #[serde(rename = "ANTHROPIC_AUTH_TOKEN")]
    anthropic_auth_token: Option<String>,
}

fn claude_settings_path() -> PathBuf {
    std::env::var("CLAUDE_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join(".claude")
        })
        .join("settings.json")
}

/// Read the key from a Claude `settings.json` (`env.ANTHROPIC_AUTH_TOKEN`).
pub fn read_claude_key(path: &Path) -> Result<Option<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file: ClaudeSettingsFile =
        serde_json::from_str(&content).with_context(|| "Failed to parse Claude settings JSON")?;
    Ok(file
        .env
        .and_then(|env| env.anthropic_auth_token)
        .filter(|k| is_service_key(k)))
}

// --- Environment ---

fn key_from_env_with<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    ENV_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.is_empty())
        .filter(|key| is_service_key(key))
}

/// First non-empty of `key88`, `ANTHROPIC_AUTH_TOKEN`, `OPENAI_API_KEY`,
/// accepted only if it is a service key.
pub fn key_from_env() -> Option<String> {
    key_from_env_with(|name| std::env::var(name).ok())
}

/// Locate an API key: explicit config value, then tool config files, then
/// the environment. Never fails; unreadable files are skipped.
pub fn discover_api_key(configured: Option<&str>) -> Option<String> {
    if let Some(key) = configured.map(str::trim).filter(|k| !k.is_empty()) {
        return Some(key.to_string());
    }

    let file_sources: [(&str, PathBuf, fn(&Path) -> Result<Option<String>>); 2] = [
        ("codex", codex_auth_path(), read_codex_key),
        ("claude", claude_settings_path(), read_claude_key),
    ];
    for (name, path, read) in file_sources {
        match read(&path) {
            Ok(Some(key)) => {
                tracing::debug!(source = name, "using API key from config file");
                return Some(key);
            }
            Ok(None) => {}
            Err(e) => {
                let reason = format!("{:#}", e);
                tracing::debug!(source = name, error = %reason, "skipping key source");
            }
        }
    }

    let key = key_from_env();
    if key.is_some() {
        tracing::debug!("using API key from environment");
    }
    key
}
