//! Loopbench Configuration
//!
//! Handles parsing of `loopbench.toml` and the environment overrides.
//!
//! ```toml
//! [engine]
//! compiler = "cranelift"   # or "winch"
//! opt_level = "speed"      # "none", "speed", "speed_and_size"
//! threads = true
//!
//! [memory]                 # imported memory for the artifact strategy
//! initial = 1
//! maximum = 16
//! shared = true
//!
//! [artifact]
//! path = "wasm/loop_loop.wasm"
//!
//! [run]
//! strategy = "wat"
//! export = "fill_0"
//! ```
//!
//! Loop bounds are deliberately absent: they live in the module source.

use crate::harness::Strategy;
use crate::instance::MemoryImport;
use crate::source::DEFAULT_EXPORT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name searched for from the working directory upwards
pub const CONFIG_FILE: &str = "loopbench.toml";

/// Environment variable selecting the compiler backend
pub const COMPILER_ENV: &str = "LOOPBENCH_COMPILER";

/// Default location of the pre-built artifact
pub const DEFAULT_ARTIFACT_PATH: &str = "wasm/loop_loop.wasm";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure matching loopbench.toml.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LoopbenchConfig {
    /// Compiler engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Memory supplied to the pre-built artifact
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Pre-built artifact location
    #[serde(default)]
    pub artifact: ArtifactConfig,

    /// Run defaults
    #[serde(default)]
    pub run: RunSection,
}

impl LoopbenchConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: LoopbenchConfig = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load configuration from the current directory or parents.
    pub fn load_from_cwd() -> ConfigResult<Self> {
        let cwd = std::env::current_dir().map_err(ConfigError::Io)?;
        Self::find_and_load(&cwd)
    }

    /// Find and load configuration by searching up from the given directory.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                return Self::load(&config_path);
            }
            if !dir.pop() {
                // Reached root without finding config
                return Ok(Self::default());
            }
        }
    }

    /// Apply `LOOPBENCH_COMPILER` if it is set.
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        if let Ok(value) = std::env::var(COMPILER_ENV) {
            self.engine.compiler = Backend::parse(&value)?;
        }
        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Code generator used by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Optimizing compiler
    #[default]
    Cranelift,
    /// Single-pass baseline compiler
    Winch,
}

impl Backend {
    /// Parse a backend name, case-insensitively
    pub fn parse(value: &str) -> ConfigResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "cranelift" => Ok(Backend::Cranelift),
            "winch" | "singlepass" => Ok(Backend::Winch),
            _ => Err(ConfigError::InvalidValue {
                key: COMPILER_ENV.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

/// Cranelift optimization level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptLevel {
    None,
    #[default]
    Speed,
    SpeedAndSize,
}

/// Engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub compiler: Backend,

    #[serde(default)]
    pub opt_level: OptLevel,

    /// Enable the threads proposal (required for shared memories)
    #[serde(default = "default_true")]
    pub threads: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compiler: Backend::default(),
            opt_level: OptLevel::default(),
            threads: true,
        }
    }
}

/// Shape of the memory handed to the artifact as `env.memory`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryConfig {
    /// Initial size in 64KiB pages
    #[serde(default = "default_initial_pages")]
    pub initial: u32,

    /// Maximum size in pages
    #[serde(default = "default_maximum_pages")]
    pub maximum: Option<u32>,

    /// Declare the memory shareable across execution contexts
    #[serde(default = "default_true")]
    pub shared: bool,
}

fn default_initial_pages() -> u32 {
    1
}

fn default_maximum_pages() -> Option<u32> {
    Some(16)
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            initial: default_initial_pages(),
            maximum: default_maximum_pages(),
            shared: true,
        }
    }
}

impl MemoryConfig {
    /// The `env.memory` import described by this section
    pub fn to_import(&self) -> MemoryImport {
        MemoryImport {
            initial: self.initial,
            maximum: self.maximum,
            shared: self.shared,
            ..MemoryImport::default()
        }
    }
}

/// Pre-built artifact settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactConfig {
    #[serde(default = "default_artifact_path")]
    pub path: PathBuf,
}

fn default_artifact_path() -> PathBuf {
    PathBuf::from(DEFAULT_ARTIFACT_PATH)
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            path: default_artifact_path(),
        }
    }
}

/// Defaults for `loopbench run`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSection {
    #[serde(default)]
    pub strategy: Strategy,

    #[serde(default = "default_export")]
    pub export: String,
}

fn default_export() -> String {
    DEFAULT_EXPORT.to_string()
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            export: default_export(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoopbenchConfig::default();
        assert_eq!(config.engine.compiler, Backend::Cranelift);
        assert!(config.engine.threads);
        assert_eq!(config.memory.initial, 1);
        assert_eq!(config.memory.maximum, Some(16));
        assert!(config.memory.shared);
        assert_eq!(config.artifact.path, PathBuf::from("wasm/loop_loop.wasm"));
        assert_eq!(config.run.export, "fill_0");
        assert_eq!(config.run.strategy, Strategy::Wat);
    }

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
[engine]
compiler = "winch"
opt_level = "none"

[memory]
initial = 2
shared = false

[run]
strategy = "artifact"
"#;
        let config: LoopbenchConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.compiler, Backend::Winch);
        assert_eq!(config.engine.opt_level, OptLevel::None);
        assert!(config.engine.threads);
        assert_eq!(config.memory.initial, 2);
        assert_eq!(config.memory.maximum, Some(16));
        assert!(!config.memory.shared);
        assert_eq!(config.run.strategy, Strategy::Artifact);
        assert_eq!(config.run.export, "fill_0");
    }

    #[test]
    fn test_find_and_load_walks_up() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(
            root.path().join(CONFIG_FILE),
            "[artifact]\npath = \"out/bench.wasm\"\n",
        )
        .unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let config = LoopbenchConfig::find_and_load(&nested).unwrap();
        assert_eq!(config.artifact.path, PathBuf::from("out/bench.wasm"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = LoopbenchConfig::load(&dir.path().join(CONFIG_FILE)).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!(Backend::parse("Cranelift").unwrap(), Backend::Cranelift);
        assert_eq!(Backend::parse("singlepass").unwrap(), Backend::Winch);
        assert!(matches!(
            Backend::parse("llvm"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_toml_roundtrip_keeps_sections() {
        let text = LoopbenchConfig::default().to_toml().unwrap();
        assert!(text.contains("[engine]"));
        assert!(text.contains("[memory]"));
        let parsed: LoopbenchConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, LoopbenchConfig::default());
    }

    #[test]
    fn test_memory_import_from_section() {
        let import = MemoryConfig::default().to_import();
        assert_eq!(import.module, "env");
        assert_eq!(import.name, "memory");
        assert_eq!(import.maximum, Some(16));
        assert!(import.shared);
    }
}
