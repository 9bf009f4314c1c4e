use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::goals::PrimaryGoal;

/// Effective application configuration: defaults, patched by an optional
/// `repfuel.toml`, then `REPFUEL_*` environment variables, then programmatic
/// overrides, validated last.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub macros: MacroPolicy,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub intent_temperature: f32,
    pub response_temperature: f32,
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// FIFO cap on `ai_context.conversation_history`.
    pub conversation_history_cap: usize,
    /// Upper bound on recommendations returned per turn.
    pub max_recommendations: usize,
    /// How many recent turns are quoted into the model prompts.
    pub prompt_recent_turns: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Protein/carb/fat calorie shares for one goal. Must sum to 1.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MacroSplit {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

/// The goal→macro tables the calculators consume. Externally supplied so a
/// deployment can retune ratios without touching workflow logic.
#[derive(Clone, Debug, PartialEq)]
pub struct MacroPolicy {
    pub ratios: BTreeMap<PrimaryGoal, MacroSplit>,
    pub protein_g_per_kg: BTreeMap<PrimaryGoal, f64>,
    pub calorie_adjustments: BTreeMap<PrimaryGoal, f64>,
    pub fiber_g_per_1000_kcal: f64,
}

impl MacroPolicy {
    pub fn ratio(&self, goal: PrimaryGoal) -> MacroSplit {
        self.ratios
            .get(&goal)
            .or_else(|| self.ratios.get(&PrimaryGoal::Maintenance))
            .copied()
            .unwrap_or(MacroSplit { protein: 0.20, carbs: 0.50, fat: 0.30 })
    }

    pub fn protein_g_per_kg(&self, goal: PrimaryGoal) -> f64 {
        self.protein_g_per_kg.get(&goal).copied().unwrap_or(1.4)
    }

    pub fn calorie_adjustment(&self, goal: PrimaryGoal) -> f64 {
        self.calorie_adjustments.get(&goal).copied().unwrap_or(0.0)
    }
}

impl Default for MacroPolicy {
    fn default() -> Self {
        use PrimaryGoal::*;
        let ratios = BTreeMap::from([
            (WeightLoss, MacroSplit { protein: 0.30, carbs: 0.40, fat: 0.30 }),
            (MuscleGain, MacroSplit { protein: 0.25, carbs: 0.45, fat: 0.30 }),
            (Endurance, MacroSplit { protein: 0.15, carbs: 0.65, fat: 0.20 }),
            (Strength, MacroSplit { protein: 0.25, carbs: 0.45, fat: 0.30 }),
            (Maintenance, MacroSplit { protein: 0.20, carbs: 0.50, fat: 0.30 }),
            (Performance, MacroSplit { protein: 0.20, carbs: 0.55, fat: 0.25 }),
        ]);
        let protein_g_per_kg = BTreeMap::from([
            (WeightLoss, 2.0),
            (MuscleGain, 1.8),
            (Endurance, 1.2),
            (Strength, 1.6),
            (Maintenance, 1.4),
            (Performance, 1.6),
        ]);
        let calorie_adjustments = BTreeMap::from([
            (WeightLoss, -500.0),
            (MuscleGain, 300.0),
            (Performance, 200.0),
        ]);
        Self { ratios, protein_g_per_kg, calorie_adjustments, fiber_g_per_1000_kcal: 14.0 }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub conversation_history_cap: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://repfuel.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                api_key: None,
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                timeout_secs: 30,
                intent_temperature: 0.3,
                response_temperature: 0.7,
            },
            agent: AgentConfig {
                conversation_history_cap: 50,
                max_recommendations: 10,
                prompt_recent_turns: 5,
            },
            macros: MacroPolicy::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("repfuel.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(api_key_value) = llm.api_key {
                self.llm.api_key = Some(api_key_value.into());
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(temperature) = llm.intent_temperature {
                self.llm.intent_temperature = temperature;
            }
            if let Some(temperature) = llm.response_temperature {
                self.llm.response_temperature = temperature;
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(cap) = agent.conversation_history_cap {
                self.agent.conversation_history_cap = cap;
            }
            if let Some(max) = agent.max_recommendations {
                self.agent.max_recommendations = max;
            }
            if let Some(turns) = agent.prompt_recent_turns {
                self.agent.prompt_recent_turns = turns;
            }
        }

        if let Some(macros) = patch.macros {
            if let Some(ratios) = macros.ratios {
                for (goal_key, split) in ratios {
                    let goal = parse_goal_key(&goal_key)?;
                    self.macros.ratios.insert(goal, split);
                }
            }
            if let Some(table) = macros.protein_g_per_kg {
                for (goal_key, grams) in table {
                    let goal = parse_goal_key(&goal_key)?;
                    self.macros.protein_g_per_kg.insert(goal, grams);
                }
            }
            if let Some(table) = macros.calorie_adjustments {
                for (goal_key, kcal) in table {
                    let goal = parse_goal_key(&goal_key)?;
                    self.macros.calorie_adjustments.insert(goal, kcal);
                }
            }
            if let Some(fiber) = macros.fiber_g_per_1000_kcal {
                self.macros.fiber_g_per_1000_kcal = fiber;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("REPFUEL_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("REPFUEL_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("REPFUEL_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("REPFUEL_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("REPFUEL_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("REPFUEL_LLM_API_KEY") {
            self.llm.api_key = Some(value.into());
        }
        if let Some(value) = read_env("REPFUEL_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("REPFUEL_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("REPFUEL_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("REPFUEL_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("REPFUEL_LLM_INTENT_TEMPERATURE") {
            self.llm.intent_temperature = parse_f32("REPFUEL_LLM_INTENT_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("REPFUEL_LLM_RESPONSE_TEMPERATURE") {
            self.llm.response_temperature = parse_f32("REPFUEL_LLM_RESPONSE_TEMPERATURE", &value)?;
        }

        if let Some(value) = read_env("REPFUEL_AGENT_HISTORY_CAP") {
            self.agent.conversation_history_cap = parse_usize("REPFUEL_AGENT_HISTORY_CAP", &value)?;
        }
        if let Some(value) = read_env("REPFUEL_AGENT_MAX_RECOMMENDATIONS") {
            self.agent.max_recommendations =
                parse_usize("REPFUEL_AGENT_MAX_RECOMMENDATIONS", &value)?;
        }

        let log_level = read_env("REPFUEL_LOGGING_LEVEL").or_else(|| read_env("REPFUEL_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("REPFUEL_LOGGING_FORMAT").or_else(|| read_env("REPFUEL_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(llm_api_key.into());
        }
        if let Some(cap) = overrides.conversation_history_cap {
            self.agent.conversation_history_cap = cap;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
        }
        for temperature in [self.llm.intent_temperature, self.llm.response_temperature] {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::Validation(format!(
                    "llm temperature {temperature} must be within 0.0..=2.0"
                )));
            }
        }
        if self.agent.conversation_history_cap == 0 {
            return Err(ConfigError::Validation(
                "agent.conversation_history_cap must be at least 1".to_string(),
            ));
        }
        for (goal, split) in &self.macros.ratios {
            let sum = split.protein + split.carbs + split.fat;
            if (sum - 1.0).abs() > 0.01 {
                return Err(ConfigError::Validation(format!(
                    "macro ratios for {} sum to {sum:.3}, expected 1.0",
                    goal.as_str()
                )));
            }
            if split.protein < 0.0 || split.carbs <= 0.0 || split.fat <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "macro ratios for {} must be positive",
                    goal.as_str()
                )));
            }
        }
        if self.macros.fiber_g_per_1000_kcal < 0.0 {
            return Err(ConfigError::Validation(
                "macros.fiber_g_per_1000_kcal must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    agent: Option<AgentPatch>,
    macros: Option<MacroPolicyPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    intent_temperature: Option<f32>,
    response_temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct AgentPatch {
    conversation_history_cap: Option<usize>,
    max_recommendations: Option<usize>,
    prompt_recent_turns: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct MacroPolicyPatch {
    ratios: Option<BTreeMap<String, MacroSplit>>,
    protein_g_per_kg: Option<BTreeMap<String, f64>>,
    calorie_adjustments: Option<BTreeMap<String, f64>>,
    fiber_g_per_1000_kcal: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

fn parse_goal_key(key: &str) -> Result<PrimaryGoal, ConfigError> {
    key.parse().map_err(|_| {
        ConfigError::Validation(format!("unknown goal `{key}` in macro policy tables"))
    })
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let default = PathBuf::from("repfuel.toml");
    default.exists().then_some(default)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}
