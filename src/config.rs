use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use vibe::agent::NetworkConfig;
use vibe::credits::CreditConfig;
use vibe::llm::AnthropicConfig;
use vibe::queue::WorkerConfig;
use vibe::runner::CodeAgentConfig;
use vibe::steps::RetryPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub sandbox: SandboxConfig,
    pub steps: StepsConfig,
    pub queue: QueueConfig,
    pub storage: StorageConfig,
    pub credits: CreditsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    pub temperature: f32,
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 8192,
            timeout_ms: 300000,
            temperature: 0.1,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_iterations: u32,
    pub sandbox_template: String,
    pub preview_port: u16,
    pub command_timeout_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            sandbox_template: "vibe-nextjs".to_string(),
            preview_port: 3000,
            command_timeout_ms: 120000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxKind {
    Local,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub provider: SandboxKind,
    /// Local sandboxes live here
    pub base_dir: PathBuf,
    /// Local templates, one directory per template name
    pub templates_dir: Option<PathBuf>,
    pub api_url: String,
    pub api_key_env: String,
    pub domain: String,
    pub request_timeout_ms: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            provider: SandboxKind::Local,
            base_dir: data_dir().join("sandboxes"),
            templates_dir: None,
            api_url: "http://localhost:8787/v1".to_string(),
            api_key_env: "SANDBOX_API_KEY".to_string(),
            domain: "localhost".to_string(),
            request_timeout_ms: 30000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StepsConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_ms: u64,
}

impl Default for StepsConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 30000,
            timeout_ms: 300000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub workers: usize,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_attempts: 3,
            retry_backoff_ms: 1000,
            poll_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: data_dir().join("data"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditsConfig {
    pub points: u32,
    pub duration_secs: u64,
    pub cost: u32,
}

impl Default for CreditsConfig {
    fn default() -> Self {
        Self {
            points: 5,
            duration_secs: 30 * 24 * 60 * 60,
            cost: 1,
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vibe")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            llm: LlmConfig::default(),
            agent: AgentConfig::default(),
            sandbox: SandboxConfig::default(),
            steps: StepsConfig::default(),
            queue: QueueConfig::default(),
            storage: StorageConfig::default(),
            credits: CreditsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Primary location: ~/.config/<project>/<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    pub fn anthropic(&self) -> AnthropicConfig {
        AnthropicConfig {
            model: self.llm.model.clone(),
            max_tokens: self.llm.max_tokens,
            timeout: Duration::from_millis(self.llm.timeout_ms),
            api_key_env: self.llm.api_key_env.clone(),
            ..Default::default()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.steps.max_attempts,
            initial_backoff: Duration::from_millis(self.steps.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.steps.max_backoff_ms),
            timeout: Duration::from_millis(self.steps.timeout_ms),
        }
    }

    pub fn code_agent(&self) -> CodeAgentConfig {
        CodeAgentConfig {
            sandbox_template: self.agent.sandbox_template.clone(),
            preview_port: self.agent.preview_port,
            network: NetworkConfig {
                max_iterations: self.agent.max_iterations,
                max_tokens: self.llm.max_tokens,
                temperature: self.llm.temperature,
                model: Some(self.llm.model.clone()),
            },
            steps: self.retry_policy(),
        }
    }

    pub fn worker(&self) -> WorkerConfig {
        WorkerConfig {
            concurrency: self.queue.workers,
            max_attempts: self.queue.max_attempts,
            retry_backoff: Duration::from_millis(self.queue.retry_backoff_ms),
            poll_interval: Duration::from_millis(self.queue.poll_interval_ms),
        }
    }

    pub fn credit(&self) -> CreditConfig {
        CreditConfig {
            points: self.credits.points,
            duration: Duration::from_secs(self.credits.duration_secs),
            cost: self.credits.cost,
        }
    }
}
