//! Client configuration: `.sirpi.toml` discovery and runtime settings.
//!
//! A config file is optional; every setting has a default and the API URL
//! can be overridden per-invocation (`--api-url` / `SIRPI_API_URL`).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use crate::stream::{Classifier, StreamTimings, DEFAULT_COMPLETION_PHRASES};

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_API_PREFIX: &str = "/api/v1";
const DEFAULT_TOKEN_ENV: &str = "SIRPI_TOKEN";

/// Wait after a deploy success before refetching project state, so backend
/// writes (application URL, outputs) have settled.
const SETTLE_AFTER_APPLY: Duration = Duration::from_secs(3);
/// Same wait after a destroy success, before the full state reset.
const SETTLE_AFTER_DESTROY: Duration = Duration::from_secs(2);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Contents of `.sirpi.toml`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SirpiConfig {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub stream: StreamSection,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ApiSection {
    pub base_url: Option<String>,
    pub prefix: Option<String>,
    pub token_env: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StreamSection {
    /// Completion-phrase overrides for the heuristic success detection.
    pub completion_phrases: Option<Vec<String>>,
    pub phrase_grace_ms: Option<u64>,
    pub complete_grace_ms: Option<u64>,
    pub settle_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_prefix: String,
    pub token_env: String,
    pub completion_phrases: Vec<String>,
    pub timings: StreamTimings,
    settle_override: Option<Duration>,
    pub poll_interval: Duration,
    /// Directory containing `.sirpi.toml`, when one was found.
    pub root: Option<PathBuf>,
}

impl Config {
    /// Load configuration: discovered file (if any) merged with defaults,
    /// with an optional API URL override from the CLI.
    pub fn load(api_url_override: Option<String>) -> Result<Self> {
        let discovered = discover()?;
        Ok(Config::resolve(discovered, api_url_override))
    }

    fn resolve(
        discovered: Option<(PathBuf, SirpiConfig)>,
        api_url_override: Option<String>,
    ) -> Self {
        let (root, file) = match discovered {
            Some((root, file)) => (Some(root), file),
            None => (None, SirpiConfig::default()),
        };

        let mut timings = StreamTimings::default();
        if let Some(ms) = file.stream.phrase_grace_ms {
            timings.phrase_grace = Duration::from_millis(ms);
        }
        if let Some(ms) = file.stream.complete_grace_ms {
            timings.complete_grace = Duration::from_millis(ms);
        }

        Config {
            api_url: api_url_override
                .or(file.api.base_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_prefix: file
                .api
                .prefix
                .unwrap_or_else(|| DEFAULT_API_PREFIX.to_string()),
            token_env: file
                .api
                .token_env
                .unwrap_or_else(|| DEFAULT_TOKEN_ENV.to_string()),
            completion_phrases: file.stream.completion_phrases.unwrap_or_else(|| {
                DEFAULT_COMPLETION_PHRASES
                    .iter()
                    .map(|p| p.to_string())
                    .collect()
            }),
            timings,
            settle_override: file.stream.settle_ms.map(Duration::from_millis),
            poll_interval: file
                .stream
                .poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
            root,
        }
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.completion_phrases.clone())
    }

    pub fn settle_after_apply(&self) -> Duration {
        self.settle_override.unwrap_or(SETTLE_AFTER_APPLY)
    }

    pub fn settle_after_destroy(&self) -> Duration {
        self.settle_override.unwrap_or(SETTLE_AFTER_DESTROY)
    }
}

/// Discover `.sirpi.toml` by walking up from the current directory. A
/// missing file is not an error; all settings have defaults.
pub fn discover() -> Result<Option<(PathBuf, SirpiConfig)>> {
    let cwd = env::current_dir()?;
    discover_from(&cwd)
}

fn discover_from(start: &Path) -> Result<Option<(PathBuf, SirpiConfig)>> {
    let mut current = start;
    loop {
        let config_path = current.join(".sirpi.toml");
        if config_path.is_file() {
            let config = load_file(&config_path)?;
            return Ok(Some((current.to_path_buf(), config)));
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return Ok(None),
        }
    }
}

fn load_file(path: &Path) -> Result<SirpiConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Create a `.sirpi.toml` with commented defaults in the current directory.
/// Idempotent: an existing file is left alone.
pub fn init() -> Result<()> {
    let cwd = env::current_dir()?;
    init_in_dir(&cwd)
}

fn init_in_dir(cwd: &Path) -> Result<()> {
    let config_path = cwd.join(".sirpi.toml");
    if config_path.exists() {
        println!(".sirpi.toml already exists, skipping.");
        return Ok(());
    }
    let default_config = r#"[api]
# base_url = "http://localhost:8000"
# prefix = "/api/v1"
# token_env = "SIRPI_TOKEN"

[stream]
# completion_phrases = ["Build complete!", "Image pushed successfully", "Terraform plan generated successfully", "Deployment completed successfully"]
# phrase_grace_ms = 2000
# complete_grace_ms = 1000
"#;
    fs::write(&config_path, default_config).context("Failed to create .sirpi.toml")?;
    println!("Created .sirpi.toml");
    Ok(())
}
