//! Fill-loop template
//!
//! Renders the benchmark module: one exported function running a
//! counter-bounded double loop that stores into successive `u32` slots.
//!
//! ```text
//! for i in 0..outer {
//!     for j in 0..inner {
//!         mem32[offset / 4 + j] = j;        // StoredValue::Counter
//!     }
//! }
//! ```
//!
//! Every outer pass overwrites the same slots, so the final memory only
//! depends on `inner`, `offset` and the stored value.

use super::ModuleSource;
use std::fmt::Write;

/// Outer bound used by the benchmark runs
pub const BENCH_OUTER: u32 = 1_000_000;

/// Inner bound used by the benchmark runs (one 64KiB page of `u32`s)
pub const BENCH_INNER: u32 = 16_384;

/// Export name of the loop function
pub const DEFAULT_EXPORT: &str = "fill_0";

/// What gets written into slot `j`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoredValue {
    /// The inner counter itself
    #[default]
    Counter,
    /// The slot's byte offset, `4 * j`
    ByteOffset,
}

impl StoredValue {
    /// Expected value of slot `index` after one full inner pass
    pub fn expected(self, index: u32) -> u32 {
        match self {
            StoredValue::Counter => index,
            StoredValue::ByteOffset => index.wrapping_mul(4),
        }
    }
}

/// How the module gets its linear memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryDecl {
    /// Module-defined memory exported as `memory`
    Exported { pages: u32 },
    /// Memory supplied by the host through the import table
    Imported {
        module: String,
        name: String,
        initial: u32,
        maximum: Option<u32>,
        shared: bool,
    },
}

impl Default for MemoryDecl {
    fn default() -> Self {
        MemoryDecl::Exported { pages: 1 }
    }
}

/// Builder for the fill-loop module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillLoop {
    export: String,
    outer: u32,
    inner: u32,
    offset: u32,
    stored_value: StoredValue,
    memory: MemoryDecl,
    data_segment: Option<(u32, Vec<u8>)>,
}

impl FillLoop {
    /// The benchmark module with its own exported page
    pub fn benchmark() -> Self {
        Self {
            export: DEFAULT_EXPORT.to_string(),
            outer: BENCH_OUTER,
            inner: BENCH_INNER,
            offset: 0,
            stored_value: StoredValue::Counter,
            memory: MemoryDecl::default(),
            data_segment: Some((16, b"abcd".to_vec())),
        }
    }

    /// The benchmark module importing a shared `env.memory` (1..16 pages)
    pub fn shared_import() -> Self {
        Self::benchmark()
            .memory(MemoryDecl::Imported {
                module: "env".to_string(),
                name: "memory".to_string(),
                initial: 1,
                maximum: Some(16),
                shared: true,
            })
            .no_data_segment()
    }

    pub fn export(mut self, name: impl Into<String>) -> Self {
        self.export = name.into();
        self
    }

    pub fn outer(mut self, bound: u32) -> Self {
        self.outer = bound;
        self
    }

    pub fn inner(mut self, bound: u32) -> Self {
        self.inner = bound;
        self
    }

    /// Byte offset of slot 0
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn stored_value(mut self, value: StoredValue) -> Self {
        self.stored_value = value;
        self
    }

    pub fn memory(mut self, memory: MemoryDecl) -> Self {
        self.memory = memory;
        self
    }

    /// Preload `bytes` at `offset` when the module is instantiated
    pub fn data_segment(mut self, offset: u32, bytes: impl Into<Vec<u8>>) -> Self {
        self.data_segment = Some((offset, bytes.into()));
        self
    }

    pub fn no_data_segment(mut self) -> Self {
        self.data_segment = None;
        self
    }

    pub fn export_name(&self) -> &str {
        &self.export
    }

    pub fn inner_bound(&self) -> u32 {
        self.inner
    }

    pub fn outer_bound(&self) -> u32 {
        self.outer
    }

    pub fn byte_offset(&self) -> u32 {
        self.offset
    }

    pub fn stored(&self) -> StoredValue {
        self.stored_value
    }

    /// Values slots `[0, inner)` hold after the loop has run at least once
    pub fn expected_slots(&self) -> Vec<u32> {
        (0..self.inner).map(|j| self.stored_value.expected(j)).collect()
    }

    /// Render the module text
    pub fn render(&self) -> ModuleSource {
        let mut out = String::with_capacity(1024);

        // Writing to a String cannot fail.
        let _ = writeln!(out, "(module");
        match &self.memory {
            MemoryDecl::Exported { pages } => {
                let _ = writeln!(out, "  (memory (export \"memory\") {pages})");
            }
            MemoryDecl::Imported {
                module,
                name,
                initial,
                maximum,
                shared,
            } => {
                let _ = write!(out, "  (import \"{module}\" \"{name}\" (memory {initial}");
                if let Some(max) = maximum {
                    let _ = write!(out, " {max}");
                }
                if *shared {
                    out.push_str(" shared");
                }
                out.push_str("))\n");
            }
        }
        if let Some((offset, bytes)) = &self.data_segment {
            let _ = writeln!(
                out,
                "  (data (i32.const {offset}) \"{}\")",
                escape_bytes(bytes)
            );
        }

        let value = match self.stored_value {
            StoredValue::Counter => "(local.get $j)",
            StoredValue::ByteOffset => "(i32.shl (local.get $j) (i32.const 2))",
        };

        let _ = write!(
            out,
            r#"  (func (export "{export}")
    (local $i i32)
    (local $j i32)
    (local.set $i (i32.const 0))
    (block $outer_done
      (loop $outer
        (br_if $outer_done (i32.ge_u (local.get $i) (i32.const {outer})))
        (local.set $j (i32.const 0))
        (block $inner_done
          (loop $inner
            (br_if $inner_done (i32.ge_u (local.get $j) (i32.const {inner})))
            (i32.store offset={offset}
              (i32.shl (local.get $j) (i32.const 2))
              {value})
            (local.set $j (i32.add (local.get $j) (i32.const 1)))
            (br $inner)))
        (local.set $i (i32.add (local.get $i) (i32.const 1)))
        (br $outer))))
)
"#,
            export = escape_bytes(self.export.as_bytes()),
            outer = self.outer,
            inner = self.inner,
            offset = self.offset,
        );

        ModuleSource::new(out)
    }
}

impl Default for FillLoop {
    fn default() -> Self {
        Self::benchmark()
    }
}

/// Escape bytes for a WebAssembly text string literal
fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'"' | b'\\' => {
                let _ = write!(out, "\\{:02x}", b);
            }
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{:02x}", b);
            }
        }
    }
    out
}
