use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use repfuel_core::{AppConfig, LoadOptions};
use toml::Value;

pub fn run(config_path: Option<PathBuf>) -> String {
    let config =
        match AppConfig::load(LoadOptions { config_path: config_path.clone(), ..Default::default() })
        {
            Ok(config) => config,
            Err(error) => return format!("config validation failed: {error}"),
        };

    let config_file_path = detect_config_path(config_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let doc = config_file_doc.as_ref();
    let file = config_file_path.as_deref();

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "database.url",
        &config.database.url,
        field_source("database.url", Some("REPFUEL_DATABASE_URL"), doc, file),
    ));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        field_source("database.max_connections", Some("REPFUEL_DATABASE_MAX_CONNECTIONS"), doc, file),
    ));
    lines.push(render_line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        field_source("database.timeout_secs", Some("REPFUEL_DATABASE_TIMEOUT_SECS"), doc, file),
    ));

    lines.push(render_line(
        "llm.base_url",
        &config.llm.base_url,
        field_source("llm.base_url", Some("REPFUEL_LLM_BASE_URL"), doc, file),
    ));
    lines.push(render_line(
        "llm.model",
        &config.llm.model,
        field_source("llm.model", Some("REPFUEL_LLM_MODEL"), doc, file),
    ));
    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "llm.api_key",
        llm_api_key,
        field_source("llm.api_key", Some("REPFUEL_LLM_API_KEY"), doc, file),
    ));
    lines.push(render_line(
        "llm.timeout_secs",
        &config.llm.timeout_secs.to_string(),
        field_source("llm.timeout_secs", Some("REPFUEL_LLM_TIMEOUT_SECS"), doc, file),
    ));
    lines.push(render_line(
        "llm.intent_temperature",
        &config.llm.intent_temperature.to_string(),
        field_source("llm.intent_temperature", Some("REPFUEL_LLM_INTENT_TEMPERATURE"), doc, file),
    ));
    lines.push(render_line(
        "llm.response_temperature",
        &config.llm.response_temperature.to_string(),
        field_source(
            "llm.response_temperature",
            Some("REPFUEL_LLM_RESPONSE_TEMPERATURE"),
            doc,
            file,
        ),
    ));

    lines.push(render_line(
        "agent.conversation_history_cap",
        &config.agent.conversation_history_cap.to_string(),
        field_source("agent.conversation_history_cap", Some("REPFUEL_AGENT_HISTORY_CAP"), doc, file),
    ));
    lines.push(render_line(
        "agent.max_recommendations",
        &config.agent.max_recommendations.to_string(),
        field_source(
            "agent.max_recommendations",
            Some("REPFUEL_AGENT_MAX_RECOMMENDATIONS"),
            doc,
            file,
        ),
    ));
    lines.push(render_line(
        "agent.prompt_recent_turns",
        &config.agent.prompt_recent_turns.to_string(),
        field_source("agent.prompt_recent_turns", None, doc, file),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        field_source("logging.level", Some("REPFUEL_LOGGING_LEVEL"), doc, file),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        field_source("logging.format", Some("REPFUEL_LOGGING_FORMAT"), doc, file),
    ));

    lines.join("\n")
}

fn detect_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then_some(path);
    }

    let root = PathBuf::from("repfuel.toml");
    root.exists().then_some(root)
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
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
