//! Compilation module
//!
//! Turns module text (or an assembled binary) into a compiled unit that can be
//! instantiated. Text is assembled in-process; nothing touches the disk.

pub mod engine;

pub use engine::{assemble, CompileError, CompiledUnit, Compiler, WASM_MAGIC};
