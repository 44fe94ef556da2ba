use std::fs;
use std::path::Path;

use comrade_core::config::{
    read_env_any, resolve_config_path, AppConfig, LoadOptions, ENV_BACKEND_API_KEY,
    ENV_BACKEND_BASE_URL, ENV_BACKEND_TIMEOUT_SECS, ENV_DISCORD_APPLICATION_ID,
    ENV_DISCORD_BOT_TOKEN, ENV_DISCORD_GATEWAY_URL, ENV_DISCORD_REST_BASE_URL, ENV_LOGGING_FORMAT,
    ENV_LOGGING_LEVEL,
};
use secrecy::ExposeSecret;
use toml::Value;

use super::{CommandResult, EXIT_CONFIG};

const ENV_SERVER_BIND_ADDRESS: &[&str] = &["COMRADE_SERVER_BIND_ADDRESS"];
const ENV_SERVER_HEALTH_CHECK_PORT: &[&str] = &["COMRADE_SERVER_HEALTH_CHECK_PORT"];
const ENV_SERVER_GRACEFUL_SHUTDOWN_SECS: &[&str] = &["COMRADE_SERVER_GRACEFUL_SHUTDOWN_SECS"];

struct Sources {
    file_path: Option<String>,
    file_doc: Option<Value>,
}

impl Sources {
    fn detect() -> Self {
        let path = resolve_config_path(None);
        let file_doc = path.as_deref().and_then(load_config_file_doc);
        Self { file_path: path.map(|path| path.display().to_string()), file_doc }
    }

    fn of(&self, key_path: &str, env_keys: &[&'static str]) -> String {
        if let Some((env_key, _)) = read_env_any(env_keys) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.file_doc {
            if contains_path(doc, key_path) {
                let file_path = self.file_path.as_deref().unwrap_or("config file");
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_CONFIG,
            )
        }
    };

    let sources = Sources::detect();
    let entries: Vec<(&str, String, &[&'static str])> = vec![
        (
            "discord.bot_token",
            redact_token(config.discord.bot_token.expose_secret()),
            ENV_DISCORD_BOT_TOKEN,
        ),
        ("discord.application_id", config.discord.application_id.clone(), ENV_DISCORD_APPLICATION_ID),
        ("discord.gateway_url", config.discord.gateway_url.clone(), ENV_DISCORD_GATEWAY_URL),
        ("discord.rest_base_url", config.discord.rest_base_url.clone(), ENV_DISCORD_REST_BASE_URL),
        ("backend.base_url", config.backend.base_url.clone(), ENV_BACKEND_BASE_URL),
        ("backend.api_key", redact_secret(config.backend.api_key.expose_secret()), ENV_BACKEND_API_KEY),
        ("backend.timeout_secs", config.backend.timeout_secs.to_string(), ENV_BACKEND_TIMEOUT_SECS),
        ("server.bind_address", config.server.bind_address.clone(), ENV_SERVER_BIND_ADDRESS),
        (
            "server.health_check_port",
            config.server.health_check_port.to_string(),
            ENV_SERVER_HEALTH_CHECK_PORT,
        ),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            ENV_SERVER_GRACEFUL_SHUTDOWN_SECS,
        ),
        ("logging.level", config.logging.level.clone(), ENV_LOGGING_LEVEL),
        ("logging.format", format!("{:?}", config.logging.format), ENV_LOGGING_FORMAT),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in entries {
        lines.push(render_line(key, &value, sources.of(key, env_keys)));
    }

    CommandResult::text(lines.join("\n"))
}

fn load_config_file_doc(path: &Path) -> Option<Value> {
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Bot tokens are `<id>.<timestamp>.<hmac>`; only the first segment is shown.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('.') {
        return format!("{prefix}.***");
    }

    "<redacted>".to_string()
}

fn redact_secret(secret: &str) -> String {
    let shown = if secret.trim().is_empty() { "<empty>" } else { "<redacted>" };
    shown.to_string()
}
