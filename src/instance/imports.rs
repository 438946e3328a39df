//! Import table
//!
//! The host side of instantiation. The only thing the harness ever supplies
//! is a linear memory, so the table is a memory slot rather than a general
//! name → extern map.

use super::InstantiateError;
use wasmtime::MemoryType;

/// Linear memory offered to a module under `module.name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryImport {
    pub module: String,
    pub name: String,
    /// Initial size in 64KiB pages
    pub initial: u32,
    /// Maximum size in pages; `None` leaves the memory unbounded
    pub maximum: Option<u32>,
    /// Shareable across execution contexts. Requires a maximum.
    pub shared: bool,
}

impl Default for MemoryImport {
    fn default() -> Self {
        Self {
            module: "env".to_string(),
            name: "memory".to_string(),
            initial: 1,
            maximum: Some(16),
            shared: true,
        }
    }
}

impl MemoryImport {
    /// A private (unshared) memory with the given page limits
    pub fn private(initial: u32, maximum: Option<u32>) -> Self {
        Self {
            initial,
            maximum,
            shared: false,
            ..Self::default()
        }
    }

    /// Does this entry satisfy the import `module.name`?
    pub fn matches(&self, module: &str, name: &str) -> bool {
        self.module == module && self.name == name
    }

    /// Check the offered memory against what the module declares.
    ///
    /// Mirrors the import subtyping rule: the offered limits must sit inside
    /// the declared ones and sharedness must agree.
    pub(crate) fn check(&self, required: &MemoryType) -> Result<(), InstantiateError> {
        let incompatible = |reason: String| InstantiateError::IncompatibleMemory {
            module: self.module.clone(),
            name: self.name.clone(),
            reason,
        };

        if required.is_64() {
            return Err(incompatible("module expects a 64-bit memory".to_string()));
        }
        if required.is_shared() != self.shared {
            return Err(incompatible(format!(
                "module declares shared={}, host offers shared={}",
                required.is_shared(),
                self.shared
            )));
        }
        if u64::from(self.initial) < required.minimum() {
            return Err(incompatible(format!(
                "module needs at least {} pages, host offers {}",
                required.minimum(),
                self.initial
            )));
        }
        if let Some(required_max) = required.maximum() {
            match self.maximum {
                Some(max) if u64::from(max) <= required_max => {}
                Some(max) => {
                    return Err(incompatible(format!(
                        "module allows at most {required_max} pages, host memory may grow to {max}"
                    )))
                }
                None => {
                    return Err(incompatible(format!(
                        "module allows at most {required_max} pages, host memory is unbounded"
                    )))
                }
            }
        }
        Ok(())
    }

    /// Host-side memory type for this entry
    pub(crate) fn memory_type(&self) -> Result<MemoryType, InstantiateError> {
        if self.shared {
            let maximum = self.maximum.ok_or_else(|| InstantiateError::Memory(format!(
                "shared memory {}.{} needs a maximum page count",
                self.module, self.name
            )))?;
            Ok(MemoryType::shared(self.initial, maximum))
        } else {
            Ok(MemoryType::new(self.initial, self.maximum))
        }
    }
}

/// Externs offered to a module at instantiation time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportTable {
    memory: Option<MemoryImport>,
}

impl ImportTable {
    /// No imports at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Offer a single linear memory
    pub fn with_memory(memory: MemoryImport) -> Self {
        Self {
            memory: Some(memory),
        }
    }

    pub fn memory(&self) -> Option<&MemoryImport> {
        self.memory.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_none()
    }
}
