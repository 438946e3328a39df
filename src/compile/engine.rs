//! Module compiler
//!
//! Two steps: text → binary with the `wat` assembler, then binary → native
//! code with a wasmtime [`Engine`]. Every call recompiles; there is no cache.

use crate::config::{Backend, EngineConfig, OptLevel};
use crate::source::ModuleSource;
use std::time::{Duration, Instant};
use thiserror::Error;
use wasmtime::{Config, Engine, Module, Strategy};

/// First four bytes of every binary module
pub const WASM_MAGIC: [u8; 4] = *b"\0asm";

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid module text: {0}")]
    Syntax(#[from] wat::Error),
    #[error("module failed to translate: {0}")]
    Translate(String),
    #[error("engine configuration rejected: {0}")]
    Engine(String),
}

/// Compiled module ready for instantiation
#[derive(Clone)]
pub struct CompiledUnit {
    module: Module,
    /// Size of the binary the module was built from
    wasm_size: usize,
    /// Compilation time (assembly + translation)
    compile_time: Duration,
}

impl CompiledUnit {
    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn engine(&self) -> &Engine {
        self.module.engine()
    }

    pub fn wasm_size(&self) -> usize {
        self.wasm_size
    }

    pub fn compile_time(&self) -> Duration {
        self.compile_time
    }

    /// Get the compilation time in microseconds
    pub fn compile_time_us(&self) -> f64 {
        self.compile_time.as_nanos() as f64 / 1000.0
    }

    /// Names of everything the module exports
    pub fn export_names(&self) -> Vec<String> {
        self.module
            .exports()
            .map(|export| export.name().to_string())
            .collect()
    }
}

impl std::fmt::Debug for CompiledUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledUnit")
            .field("wasm_size", &self.wasm_size)
            .field("compile_time", &self.compile_time)
            .finish_non_exhaustive()
    }
}

/// Module compiler bound to one engine configuration
pub struct Compiler {
    engine: Engine,
}

impl Compiler {
    /// Create a compiler with the default engine (Cranelift, threads on)
    pub fn new() -> Result<Self, CompileError> {
        Self::with_config(&EngineConfig::default())
    }

    /// Create a compiler for the given engine settings
    pub fn with_config(settings: &EngineConfig) -> Result<Self, CompileError> {
        let mut config = Config::new();
        config.strategy(match settings.compiler {
            Backend::Cranelift => Strategy::Cranelift,
            Backend::Winch => Strategy::Winch,
        });
        config.cranelift_opt_level(match settings.opt_level {
            OptLevel::None => wasmtime::OptLevel::None,
            OptLevel::Speed => wasmtime::OptLevel::Speed,
            OptLevel::SpeedAndSize => wasmtime::OptLevel::SpeedAndSize,
        });
        config.wasm_threads(settings.threads);
        config.shared_memory(settings.threads);

        let engine = Engine::new(&config).map_err(|e| {
            tracing::warn!(compiler = ?settings.compiler, "engine rejected configuration");
            CompileError::Engine(format!("{e:#}"))
        })?;

        tracing::debug!(
            compiler = ?settings.compiler,
            opt_level = ?settings.opt_level,
            threads = settings.threads,
            "engine ready"
        );
        Ok(Self { engine })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Compile module text
    pub fn compile(&self, source: &ModuleSource) -> Result<CompiledUnit, CompileError> {
        let start = Instant::now();
        let wasm = assemble(source)?;
        self.translate(&wasm, start)
    }

    /// Compile an already-assembled binary module
    pub fn compile_binary(&self, wasm: &[u8]) -> Result<CompiledUnit, CompileError> {
        self.translate(wasm, Instant::now())
    }

    fn translate(&self, wasm: &[u8], start: Instant) -> Result<CompiledUnit, CompileError> {
        let module = Module::new(&self.engine, wasm)
            .map_err(|e| CompileError::Translate(format!("{e:#}")))?;
        let compile_time = start.elapsed();

        tracing::debug!(
            wasm_size = wasm.len(),
            compile_us = compile_time.as_micros() as u64,
            "module compiled"
        );

        Ok(CompiledUnit {
            module,
            wasm_size: wasm.len(),
            compile_time,
        })
    }
}

/// Assemble module text into binary
pub fn assemble(source: &ModuleSource) -> Result<Vec<u8>, CompileError> {
    Ok(wat::parse_str(source.as_str())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FillLoop;

    #[test]
    fn test_compile_template() {
        let compiler = Compiler::new().unwrap();
        let unit = compiler
            .compile(&FillLoop::benchmark().outer(3).inner(4).render())
            .unwrap();

        assert!(unit.wasm_size() > 0);
        let exports = unit.export_names();
        assert!(exports.contains(&"fill_0".to_string()));
        assert!(exports.contains(&"memory".to_string()));
    }

    #[test]
    fn test_assemble_magic() {
        let wasm = assemble(&ModuleSource::new("(module)")).unwrap();
        assert_eq!(&wasm[..4], &WASM_MAGIC);
    }

    #[test]
    fn test_syntax_error() {
        let compiler = Compiler::new().unwrap();
        let err = compiler
            .compile(&ModuleSource::new("(module (func (export \"f\") (i32.bogus)))"))
            .unwrap_err();
        assert!(matches!(err, CompileError::Syntax(_)), "{err}");
    }

    #[test]
    fn test_validation_error() {
        // Well-formed text, but the function leaves an i32 on the stack.
        let compiler = Compiler::new().unwrap();
        let err = compiler
            .compile(&ModuleSource::new(
                "(module (func (export \"f\") (i32.const 1)))",
            ))
            .unwrap_err();
        assert!(matches!(err, CompileError::Translate(_)), "{err}");
    }

    #[test]
    fn test_compile_binary_rejects_garbage() {
        let compiler = Compiler::new().unwrap();
        let err = compiler.compile_binary(b"not wasm").unwrap_err();
        assert!(matches!(err, CompileError::Translate(_)));
    }
}
