//! Compile-and-run harness
//!
//! One linear pass per run:
//!
//! ```text
//! Uncompiled → Compiled → Instantiated → Invoked → Reported
//! ```
//!
//! The `artifact` strategy enters at `Compiled` after loading the binary from
//! disk; the `native` strategy skips straight to `Invoked`. Any failure ends
//! the run with a [`HarnessError`] naming the stage that failed.

use crate::artifact::{load_artifact, LoadError};
use crate::compile::{CompileError, CompiledUnit, Compiler};
use crate::config::{EngineConfig, LoopbenchConfig};
use crate::instance::{instantiate, ImportTable, InstantiateError, MemoryImport};
use crate::invoke::{invoke, InvokeError};
use crate::native;
use crate::source::{FillLoop, ModuleSource, BENCH_INNER, BENCH_OUTER};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Execution strategy
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Compile module text in-process, run against its own memory
    #[default]
    Wat,
    /// The same loop in plain Rust
    Native,
    /// Load a pre-built binary module, run against an imported memory
    Artifact,
}

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Wat => "wat",
            Strategy::Native => "native",
            Strategy::Artifact => "artifact",
        }
    }
}

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Uncompiled,
    Compiled,
    Instantiated,
    Invoked,
    Reported,
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("load stage failed: {0}")]
    Load(#[from] LoadError),
    #[error("compile stage failed: {0}")]
    Compile(#[from] CompileError),
    #[error("instantiate stage failed: {0}")]
    Instantiate(#[from] InstantiateError),
    #[error("invoke stage failed: {0}")]
    Invoke(#[from] InvokeError),
}

impl HarnessError {
    /// Name of the failing stage
    pub fn stage(&self) -> &'static str {
        match self {
            HarnessError::Load(_) => "load",
            HarnessError::Compile(_) => "compile",
            HarnessError::Instantiate(_) => "instantiate",
            HarnessError::Invoke(_) => "invoke",
        }
    }
}

/// Everything one run needs
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub strategy: Strategy,
    /// Export to invoke
    pub export: String,
    /// Module text for `wat`; the benchmark template when `None`
    pub source: Option<ModuleSource>,
    /// Binary module for `artifact`
    pub artifact: PathBuf,
    pub engine: EngineConfig,
    /// Memory offered to compiled modules; ignored by modules that define their own
    pub memory: MemoryImport,
}

impl RunConfig {
    /// Build from the resolved file configuration
    pub fn from_config(config: &LoopbenchConfig) -> Self {
        Self {
            strategy: config.run.strategy,
            export: config.run.export.clone(),
            source: None,
            artifact: config.artifact.path.clone(),
            engine: config.engine.clone(),
            memory: config.memory.to_import(),
        }
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn source(mut self, source: ModuleSource) -> Self {
        self.source = Some(source);
        self
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::from_config(&LoopbenchConfig::default())
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub strategy: Strategy,
    pub export: String,
    pub elapsed: Duration,
}

impl Report {
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.elapsed_secs())
    }
}

/// Run one benchmark to completion
pub fn run(config: &RunConfig) -> Result<Report, HarnessError> {
    let span = tracing::debug_span!("run", strategy = config.strategy.name());
    let _enter = span.enter();

    let elapsed = match config.strategy {
        Strategy::Native => {
            transition(Stage::Uncompiled, Stage::Invoked);
            native::run(BENCH_OUTER, BENCH_INNER).elapsed
        }
        Strategy::Wat => {
            let template;
            let source = match &config.source {
                Some(source) => source,
                None => {
                    template = FillLoop::benchmark().render();
                    &template
                }
            };
            let unit = Compiler::with_config(&config.engine)?.compile(source)?;
            transition(Stage::Uncompiled, Stage::Compiled);
            let imports = ImportTable::with_memory(config.memory.clone());
            run_unit(&unit, &imports, &config.export)?
        }
        Strategy::Artifact => {
            let wasm = load_artifact(&config.artifact)?;
            let unit = Compiler::with_config(&config.engine)?.compile_binary(&wasm)?;
            transition(Stage::Uncompiled, Stage::Compiled);
            let imports = ImportTable::with_memory(config.memory.clone());
            run_unit(&unit, &imports, &config.export)?
        }
    };

    transition(Stage::Invoked, Stage::Reported);
    Ok(Report {
        strategy: config.strategy,
        export: config.export.clone(),
        elapsed,
    })
}

fn run_unit(
    unit: &CompiledUnit,
    imports: &ImportTable,
    export: &str,
) -> Result<Duration, HarnessError> {
    let mut instance = instantiate(unit, imports)?;
    transition(Stage::Compiled, Stage::Instantiated);

    let invocation = invoke(&mut instance, export)?;
    transition(Stage::Instantiated, Stage::Invoked);
    Ok(invocation.elapsed)
}

fn transition(from: Stage, to: Stage) {
    tracing::debug!(?from, ?to, "stage");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_loop() -> ModuleSource {
        FillLoop::benchmark().outer(3).inner(4).render()
    }

    #[test]
    fn test_wat_run_reports() {
        let config = RunConfig::default().source(small_loop());
        let report = run(&config).unwrap();
        assert_eq!(report.strategy, Strategy::Wat);
        assert_eq!(report.export, "fill_0");
        assert!(report.elapsed_secs() >= 0.0);
    }

    #[test]
    fn test_wat_run_with_imported_memory() {
        let config =
            RunConfig::default().source(FillLoop::shared_import().outer(3).inner(4).render());
        let report = run(&config).unwrap();
        assert_eq!(report.strategy, Strategy::Wat);
    }

    #[test]
    fn test_report_display_is_decimal_seconds() {
        let report = Report {
            strategy: Strategy::Wat,
            export: "fill_0".into(),
            elapsed: Duration::from_millis(1500),
        };
        assert_eq!(report.to_string(), "1.5");
    }

    #[test]
    fn test_compile_stage_named() {
        let config = RunConfig::default().source(ModuleSource::new("(module (oops))"));
        let err = run(&config).unwrap_err();
        assert_eq!(err.stage(), "compile");
        assert!(err.to_string().starts_with("compile stage failed"));
    }

    #[test]
    fn test_invoke_stage_named() {
        let mut config = RunConfig::default().source(small_loop());
        config.export = "missing".into();
        let err = run(&config).unwrap_err();
        assert_eq!(err.stage(), "invoke");
    }

    #[test]
    fn test_missing_artifact_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RunConfig::default().strategy(Strategy::Artifact);
        config.artifact = dir.path().join("absent.wasm");

        let err = run(&config).unwrap_err();
        assert!(matches!(err, HarnessError::Load(LoadError::NotFound(_))));
        assert_eq!(err.stage(), "load");
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(Strategy::Wat.name(), "wat");
        assert_eq!(Strategy::Native.name(), "native");
        assert_eq!(Strategy::Artifact.name(), "artifact");
    }
}
