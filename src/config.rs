use crate::error::{Error, Result};
use crate::services::profile_builder::ExperiencePrecedence;
use crate::services::scoring_service::ScoringWeights;
use crate::services::skill_normalizer::SynonymTable;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynonymSource {
    Builtin,
    Disabled,
    File(PathBuf),
}

impl SynonymSource {
    pub fn load(&self) -> Result<SynonymTable> {
        match self {
            SynonymSource::Builtin => Ok(SynonymTable::builtin()),
            SynonymSource::Disabled => Ok(SynonymTable::empty()),
            SynonymSource::File(path) => SynonymTable::from_json_file(path),
        }
    }
}

impl FromStr for SynonymSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "" => Err("empty value".to_string()),
            "builtin" => Ok(SynonymSource::Builtin),
            "none" => Ok(SynonymSource::Disabled),
            path => Ok(SynonymSource::File(PathBuf::from(path))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected `text` or `json`, got `{}`", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    /// Requests per second allowed to each principal (token `sub`).
    pub api_rps: u32,
    pub scoring_weights: ScoringWeights,
    pub ranking_threads: usize,
    pub status_update_retries: u32,
    pub experience_precedence: ExperiencePrecedence,
    pub skill_synonyms: SynonymSource,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: "0.0.0.0:8080".to_string(),
            database_url: None,
            database_max_connections: 10,
            jwt_secret: String::new(),
            api_rps: 100,
            scoring_weights: ScoringWeights::default(),
            ranking_threads: default_ranking_threads(),
            status_update_retries: 3,
            experience_precedence: ExperiencePrecedence::default(),
            skill_synonyms: SynonymSource::Builtin,
            log_format: LogFormat::Text,
        }
    }
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let defaults = Config::default();

        let default_weights = defaults.scoring_weights;
        let scoring_weights = ScoringWeights::new(
            get_env_parse_or("SKILL_WEIGHT", default_weights.skill_weight())?,
            get_env_parse_or("EXPERIENCE_WEIGHT", default_weights.experience_weight())?,
            get_env_parse_or("EDUCATION_WEIGHT", default_weights.education_weight())?,
        )
        .map_err(|e| Error::Config(e.to_string()))?;

        let ranking_threads: usize = get_env_parse_or("RANKING_THREADS", defaults.ranking_threads)?;
        if ranking_threads == 0 {
            return Err(Error::Config("RANKING_THREADS must be at least 1".to_string()));
        }

        let jwt_secret = get_env("JWT_SECRET")?;
        if jwt_secret.trim().is_empty() {
            return Err(Error::Config("JWT_SECRET must not be empty".to_string()));
        }

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", &defaults.server_address),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            database_max_connections: get_env_parse_or(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            jwt_secret,
            api_rps: get_env_parse_or("API_RPS", defaults.api_rps)?,
            scoring_weights,
            ranking_threads,
            status_update_retries: get_env_parse_or(
                "STATUS_UPDATE_RETRIES",
                defaults.status_update_retries,
            )?,
            experience_precedence: get_env_parse_or(
                "EXPERIENCE_PRECEDENCE",
                defaults.experience_precedence,
            )?,
            skill_synonyms: get_env_parse_or("SKILL_SYNONYMS", defaults.skill_synonyms)?,
            log_format: get_env_parse_or("LOG_FORMAT", defaults.log_format)?,
        })
    }
}

fn default_ranking_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
