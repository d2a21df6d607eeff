use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// How to handle invalid UTF-8 in the input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// Fail on the first invalid sequence
    #[default]
    FailFast,
    /// Replace invalid sequences with U+FFFD and warn
    Lossy,
}

/// Configuration for one pipeline run.
///
/// Loaded from (in order of precedence):
/// 1. Custom config file specified via `--config`
/// 2. Local `.shmgrep.yaml` in the current directory
/// 3. Global `$HOME/.config/shmgrep/config.yaml`
///
/// CLI arguments take precedence over every file value; the merging
/// behavior is defined in `merge_with_cli`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Word to match (whole-word, case-insensitive)
    #[serde(default)]
    pub word: String,

    /// File whose lines are streamed to the worker
    #[serde(default)]
    pub file_path: PathBuf,

    /// Number of matcher shards the worker fans lines out to
    #[serde(default = "default_shard_count")]
    pub shard_count: NonZeroUsize,

    /// Whether to only show statistics instead of matching lines
    #[serde(default)]
    pub stats_only: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// How to handle invalid UTF-8 in the input file
    #[serde(default)]
    pub encoding: EncodingMode,
}

fn default_shard_count() -> NonZeroUsize {
    NonZeroUsize::new(4).unwrap()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            word: String::new(),
            file_path: PathBuf::new(),
            shard_count: default_shard_count(),
            stats_only: false,
            log_level: default_log_level(),
            encoding: EncodingMode::default(),
        }
    }
}

impl RunConfig {
    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from a specific file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            // Global config
            dirs::config_dir().map(|p| p.join("shmgrep/config.yaml")),
            // Local config
            Some(PathBuf::from(".shmgrep.yaml")),
            // Custom config
            config_path.map(PathBuf::from),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli_config: RunConfig) -> Self {
        // CLI values take precedence over config file values
        if !cli_config.word.is_empty() {
            self.word = cli_config.word;
        }
        if cli_config.file_path != PathBuf::new() {
            self.file_path = cli_config.file_path;
        }
        if cli_config.shard_count != default_shard_count() {
            self.shard_count = cli_config.shard_count;
        }
        if cli_config.stats_only {
            self.stats_only = true;
        }
        if cli_config.log_level != default_log_level() {
            self.log_level = cli_config.log_level;
        }
        if cli_config.encoding != EncodingMode::default() {
            self.encoding = cli_config.encoding;
        }
        self
    }
}
