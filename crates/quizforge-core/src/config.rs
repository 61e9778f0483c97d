//! Workspace configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level quizforge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizforgeConfig {
    /// Where attempt files are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Fixed seed for question/option shuffling. Random when unset.
    #[serde(default)]
    pub shuffle_seed: Option<u64>,
    /// Wall-clock length of one countdown second, in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./quizforge-attempts")
}
fn default_tick_interval() -> u64 {
    1000
}

impl Default for QuizforgeConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            shuffle_seed: None,
            tick_interval_ms: default_tick_interval(),
        }
    }
}

impl QuizforgeConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizforge.toml` in the current directory
/// 2. `~/.config/quizforge/config.toml`
///
/// Environment variable overrides: `QUIZFORGE_OUTPUT_DIR`, `QUIZFORGE_SEED`.
pub fn load_config() -> Result<QuizforgeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizforgeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizforge.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<QuizforgeConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QuizforgeConfig::default(),
    };

    apply_env_overrides(config, |name| std::env::var(name).ok())
}

/// Apply `QUIZFORGE_*` overrides using `lookup` to read variables.
pub fn apply_env_overrides(
    mut config: QuizforgeConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<QuizforgeConfig> {
    if let Some(dir) = lookup("QUIZFORGE_OUTPUT_DIR").filter(|d| !d.is_empty()) {
        config.output_dir = PathBuf::from(dir);
    }

    if let Some(seed) = lookup("QUIZFORGE_SEED").filter(|s| !s.is_empty()) {
        let seed = seed
            .trim()
            .parse::<u64>()
            .with_context(|| format!("QUIZFORGE_SEED is not a valid seed: {seed}"))?;
        config.shuffle_seed = Some(seed);
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizforge"))
}
