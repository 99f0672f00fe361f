use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

const CONFIG_FILE: &str = ".doc-impact.toml";

const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4-turbo";
const DEFAULT_MAX_TOKENS: u32 = 2000;
const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("GitHub token not found: pass --token or set GITHUB_TOKEN")]
    MissingGithubToken,

    #[error("OpenAI API key not found: set OPENAI_API_KEY")]
    MissingOpenAiKey,

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },
}

/// Fully-resolved configuration, built once at startup and passed into each
/// component. No other module reads the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub github_token: String,
    pub github_api_url: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Raw shape of the optional .doc-impact.toml file.
/// All fields are optional — the tool works with zero config plus env vars.
#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    github: GitHubSection,

    #[serde(default)]
    openai: OpenAiSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GitHubSection {
    /// GitHub API token. If None, falls back to the GITHUB_TOKEN env var.
    token: Option<String>,
    /// API base URL, for GitHub Enterprise installs.
    api_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct OpenAiSection {
    /// API key. If None, falls back to the OPENAI_API_KEY env var.
    api_key: Option<String>,
    /// Base URL for OpenAI-compatible endpoints.
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl FileConfig {
    fn load_from(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }
}

impl Config {
    /// Load configuration from .doc-impact.toml in the current directory (if
    /// present) plus environment variables. `token_override` comes from the
    /// --token CLI flag and takes precedence over both.
    pub fn load(token_override: Option<String>) -> Result<Config, ConfigError> {
        let path = Path::new(CONFIG_FILE);
        let file = if path.exists() {
            FileConfig::load_from(path)?
        } else {
            FileConfig::default()
        };
        Self::resolve(file, token_override)
    }

    fn resolve(file: FileConfig, token_override: Option<String>) -> Result<Config, ConfigError> {
        let github_token = token_override
            .or(file.github.token)
            .or_else(|| env_var("GITHUB_TOKEN"))
            .ok_or(ConfigError::MissingGithubToken)?;

        let openai_api_key = file
            .openai
            .api_key
            .or_else(|| env_var("OPENAI_API_KEY"))
            .ok_or(ConfigError::MissingOpenAiKey)?;

        let max_tokens = match file.openai.max_tokens {
            Some(n) => n,
            None => parse_env("OPENAI_MAX_TOKENS", DEFAULT_MAX_TOKENS)?,
        };
        let temperature = match file.openai.temperature {
            Some(t) => t,
            None => parse_env("OPENAI_TEMPERATURE", DEFAULT_TEMPERATURE)?,
        };

        Ok(Config {
            github_token,
            github_api_url: file
                .github
                .api_url
                .or_else(|| env_var("GITHUB_API_URL"))
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            openai_api_key,
            openai_base_url: file
                .openai
                .base_url
                .or_else(|| env_var("OPENAI_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            model: file
                .openai
                .model
                .or_else(|| env_var("OPENAI_MODEL"))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens,
            temperature,
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env_var(name) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            var: name.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}
