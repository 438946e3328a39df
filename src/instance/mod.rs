//! Instantiation
//!
//! Binds a [`CompiledUnit`] to a fresh store, links the host-supplied memory
//! and exposes the resulting exports and linear memory.
//!
//! Imports are checked before the linker runs so that a missing or
//! mis-shaped memory is reported with the import's name and the reason,
//! rather than as a generic link failure.

mod imports;
mod memory;

pub use imports::{ImportTable, MemoryImport};
pub use memory::{MemoryError, MemoryView};

use crate::compile::CompiledUnit;
use memory::LinearMemory;
use thiserror::Error;
use wasmtime::{Engine, Extern, ExternType, Linker, Memory, Module, SharedMemory, Store};

#[derive(Debug, Error)]
pub enum InstantiateError {
    #[error("missing {kind} import {module}.{name}")]
    MissingImport {
        module: String,
        name: String,
        kind: &'static str,
    },
    #[error("incompatible memory import {module}.{name}: {reason}")]
    IncompatibleMemory {
        module: String,
        name: String,
        reason: String,
    },
    #[error("failed to create linear memory: {0}")]
    Memory(String),
    #[error("instantiation failed: {0}")]
    Link(String),
}

/// A running module with its own store and linear memory
pub struct Instance {
    pub(crate) store: Store<()>,
    pub(crate) instance: wasmtime::Instance,
    module: Module,
    memory: Option<LinearMemory>,
}

impl Instance {
    /// Names of everything the instance exports
    pub fn exports(&self) -> Vec<String> {
        self.module
            .exports()
            .map(|export| export.name().to_string())
            .collect()
    }

    pub fn has_export(&self, name: &str) -> bool {
        self.module.get_export(name).is_some()
    }

    pub fn has_memory(&self) -> bool {
        self.memory.is_some()
    }

    /// Was the memory created shareable across execution contexts?
    pub fn memory_is_shared(&self) -> bool {
        self.memory.as_ref().is_some_and(LinearMemory::is_shared)
    }

    /// Current byte length of linear memory (0 without a memory)
    pub fn memory_size(&self) -> usize {
        self.memory_bytes().map_or(0, <[u8]>::len)
    }

    /// `u32` view of `len` elements starting at byte `offset`
    pub fn memory_view(&self, offset: usize, len: usize) -> Result<MemoryView<'_>, MemoryError> {
        let bytes = self.memory_bytes().ok_or(MemoryError::NoMemory)?;
        MemoryView::new(bytes, offset, len)
    }

    /// Copy `len` `u32`s out of linear memory
    pub fn read_u32s(&self, offset: usize, len: usize) -> Result<Vec<u32>, MemoryError> {
        Ok(self.memory_view(offset, len)?.to_vec())
    }

    /// Copy of the whole linear memory
    pub fn memory_snapshot(&self) -> Vec<u8> {
        self.memory_bytes().map(<[u8]>::to_vec).unwrap_or_default()
    }

    fn memory_bytes(&self) -> Option<&[u8]> {
        self.memory.as_ref().map(|memory| memory.bytes(&self.store))
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("exports", &self.exports())
            .field("memory_size", &self.memory_size())
            .field("memory_shared", &self.memory_is_shared())
            .finish()
    }
}

/// Instantiate a compiled unit against an import table
pub fn instantiate(unit: &CompiledUnit, imports: &ImportTable) -> Result<Instance, InstantiateError> {
    let engine = unit.engine();
    let module = unit.module();
    let mut store = Store::new(engine, ());
    let mut linker: Linker<()> = Linker::new(engine);
    let mut imported = None;

    for import in module.imports() {
        let (module_name, name) = (import.module(), import.name());
        let required = match import.ty() {
            ExternType::Memory(ty) => ty,
            other => {
                return Err(InstantiateError::MissingImport {
                    module: module_name.to_string(),
                    name: name.to_string(),
                    kind: extern_kind(&other),
                })
            }
        };

        let offered = imports
            .memory()
            .filter(|memory| memory.matches(module_name, name))
            .ok_or_else(|| InstantiateError::MissingImport {
                module: module_name.to_string(),
                name: name.to_string(),
                kind: "memory",
            })?;
        offered.check(&required)?;

        let memory = create_memory(&mut store, engine, offered)?;
        let defined = match &memory {
            LinearMemory::Private(m) => linker.define(&mut store, module_name, name, *m),
            LinearMemory::Shared(m) => linker.define(&mut store, module_name, name, m.clone()),
        };
        defined.map_err(|e| InstantiateError::Link(format!("{e:#}")))?;

        tracing::debug!(
            module = module_name,
            name,
            initial = offered.initial,
            maximum = ?offered.maximum,
            shared = offered.shared,
            "linked memory import"
        );
        imported = Some(memory);
    }

    let instance = linker
        .instantiate(&mut store, module)
        .map_err(|e| InstantiateError::Link(format!("{e:#}")))?;

    let memory = match imported {
        Some(memory) => Some(memory),
        None => exported_memory(&mut store, &instance, module),
    };

    let instance = Instance {
        store,
        instance,
        module: module.clone(),
        memory,
    };
    tracing::debug!(
        exports = ?instance.exports(),
        memory_size = instance.memory_size(),
        "instantiated"
    );
    Ok(instance)
}

fn create_memory(
    store: &mut Store<()>,
    engine: &Engine,
    offered: &MemoryImport,
) -> Result<LinearMemory, InstantiateError> {
    let ty = offered.memory_type()?;
    let memory = if offered.shared {
        SharedMemory::new(engine, ty).map(LinearMemory::Shared)
    } else {
        Memory::new(store, ty).map(LinearMemory::Private)
    };
    memory.map_err(|e| InstantiateError::Memory(format!("{e:#}")))
}

/// The export named `memory`, else the first exported memory
fn exported_memory(
    store: &mut Store<()>,
    instance: &wasmtime::Instance,
    module: &Module,
) -> Option<LinearMemory> {
    let names: Vec<&str> = module
        .exports()
        .filter(|export| matches!(export.ty(), ExternType::Memory(_)))
        .map(|export| export.name())
        .collect();
    let name = names
        .iter()
        .copied()
        .find(|name| *name == "memory")
        .or_else(|| names.first().copied())?;

    match instance.get_export(&mut *store, name)? {
        Extern::Memory(memory) => Some(LinearMemory::Private(memory)),
        Extern::SharedMemory(memory) => Some(LinearMemory::Shared(memory)),
        _ => None,
    }
}

fn extern_kind(ty: &ExternType) -> &'static str {
    match ty {
        ExternType::Func(_) => "function",
        ExternType::Global(_) => "global",
        ExternType::Table(_) => "table",
        ExternType::Memory(_) => "memory",
        _ => "extern",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::Compiler;
    use crate::source::{FillLoop, ModuleSource};

    fn compile(text: &str) -> CompiledUnit {
        Compiler::new().unwrap().compile(&ModuleSource::new(text)).unwrap()
    }

    #[test]
    fn test_exported_memory_with_data_segment() {
        let unit = Compiler::new()
            .unwrap()
            .compile(&FillLoop::benchmark().render())
            .unwrap();
        let instance = instantiate(&unit, &ImportTable::empty()).unwrap();

        assert_eq!(instance.memory_size(), 65536);
        assert!(!instance.memory_is_shared());
        assert_eq!(&instance.memory_snapshot()[16..20], b"abcd");
        assert!(instance.has_export("fill_0"));
    }

    #[test]
    fn test_first_memory_when_not_named_memory() {
        let unit = compile(r#"(module (memory (export "heap") 2))"#);
        let instance = instantiate(&unit, &ImportTable::empty()).unwrap();
        assert_eq!(instance.memory_size(), 2 * 65536);
    }

    #[test]
    fn test_no_memory() {
        let unit = compile(r#"(module (func (export "nop")))"#);
        let instance = instantiate(&unit, &ImportTable::empty()).unwrap();
        assert!(!instance.has_memory());
        assert_eq!(instance.memory_size(), 0);
        assert_eq!(
            instance.memory_view(0, 1).unwrap_err(),
            MemoryError::NoMemory
        );
    }

    #[test]
    fn test_function_import_is_missing() {
        let unit = compile(r#"(module (import "env" "log" (func (param i32))))"#);
        let err = instantiate(&unit, &ImportTable::with_memory(MemoryImport::default()))
            .unwrap_err();
        match err {
            InstantiateError::MissingImport { module, name, kind } => {
                assert_eq!(module, "env");
                assert_eq!(name, "log");
                assert_eq!(kind, "function");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_view_past_end_is_rejected() {
        let unit = compile(r#"(module (memory (export "memory") 1))"#);
        let instance = instantiate(&unit, &ImportTable::empty()).unwrap();
        assert!(instance.memory_view(65532, 1).is_ok());
        assert!(matches!(
            instance.memory_view(65532, 2),
            Err(MemoryError::OutOfBounds { .. })
        ));
    }
}
