//! Loopbench - nested-loop wall-clock benchmark
//!
//! Times one tight double loop under three execution strategies:
//!
//! - **wat**: WebAssembly text compiled in-process and run against the
//!   module's own memory
//! - **native**: the same loop written in Rust
//! - **artifact**: a pre-built binary module loaded from disk and run against
//!   an imported, shared-capable memory
//!
//! # Example
//!
//! ```rust,no_run
//! use loopbench::compile::Compiler;
//! use loopbench::instance::{instantiate, ImportTable};
//! use loopbench::invoke::invoke;
//! use loopbench::source::FillLoop;
//!
//! let source = FillLoop::benchmark().outer(3).inner(4).render();
//! let unit = Compiler::new()?.compile(&source)?;
//! let mut instance = instantiate(&unit, &ImportTable::empty())?;
//!
//! let invocation = invoke(&mut instance, "fill_0")?;
//! println!("{}", invocation.elapsed_secs());
//! assert_eq!(instance.read_u32s(0, 4)?, vec![0, 1, 2, 3]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐   wat    ┌───────────────┐  wasmtime  ┌──────────────┐
//! │ Module Source │ ───────▶ │  wasm binary  │ ─────────▶ │ CompiledUnit │
//! └───────────────┘          └───────────────┘            └──────┬───────┘
//!                                   ▲                            │ + ImportTable
//!                         artifact  │                            ▼
//!                     wasm/*.wasm ──┘                     ┌──────────────┐
//!                                                         │   Instance   │
//!                                                         └──────┬───────┘
//!                                                                │ invoke(export)
//!                                                                ▼
//!                                                          elapsed seconds
//! ```

#![warn(clippy::all)]

pub mod artifact;
pub mod compile;
pub mod config;
pub mod harness;
pub mod instance;
pub mod invoke;
pub mod native;
pub mod source;

// Re-export commonly used types
pub use artifact::{load_artifact, write_artifact, LoadError};
pub use compile::{CompileError, CompiledUnit, Compiler};
pub use config::{Backend, ConfigError, EngineConfig, LoopbenchConfig, OptLevel};
pub use harness::{run, HarnessError, Report, RunConfig, Stage, Strategy};
pub use instance::{
    instantiate, ImportTable, Instance, InstantiateError, MemoryError, MemoryImport, MemoryView,
};
pub use invoke::{invoke, Invocation, InvokeError};
pub use source::{FillLoop, MemoryDecl, ModuleSource, StoredValue};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
