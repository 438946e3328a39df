//! Linear memory access
//!
//! An instance's memory is either a private [`Memory`] living in the store or
//! a [`SharedMemory`] that could in principle be handed to other threads. The
//! harness only ever runs one context, so both are read the same way.

use thiserror::Error;
use wasmtime::{Memory, SharedMemory, Store};

/// Width of one view element in bytes
const ELEM_SIZE: usize = std::mem::size_of::<u32>();

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryError {
    #[error("instance has no linear memory")]
    NoMemory,
    #[error("view of {len} u32 values at byte {offset} exceeds memory of {byte_len} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        byte_len: usize,
    },
}

/// The linear memory an instance runs against
#[derive(Clone)]
pub(crate) enum LinearMemory {
    Private(Memory),
    Shared(SharedMemory),
}

impl LinearMemory {
    pub(crate) fn is_shared(&self) -> bool {
        matches!(self, LinearMemory::Shared(_))
    }

    pub(crate) fn bytes<'a>(&'a self, store: &'a Store<()>) -> &'a [u8] {
        match self {
            LinearMemory::Private(memory) => memory.data(store),
            LinearMemory::Shared(memory) => {
                let cells = memory.data();
                // SAFETY: `UnsafeCell<u8>` has the same layout as `u8`. No other
                // execution context is ever given this memory, and guest code
                // only runs through `&mut Instance`, so nothing writes while the
                // returned borrow is alive.
                unsafe { std::slice::from_raw_parts(cells.as_ptr().cast::<u8>(), cells.len()) }
            }
        }
    }
}

/// Read-only `u32` window over linear memory
#[derive(Debug, Clone, Copy)]
pub struct MemoryView<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> MemoryView<'a> {
    /// View `len` little-endian `u32`s starting at byte `offset`
    pub fn new(memory: &'a [u8], offset: usize, len: usize) -> Result<Self, MemoryError> {
        let out_of_bounds = || MemoryError::OutOfBounds {
            offset,
            len,
            byte_len: memory.len(),
        };
        let end = len
            .checked_mul(ELEM_SIZE)
            .and_then(|size| size.checked_add(offset))
            .ok_or_else(out_of_bounds)?;
        let bytes = memory.get(offset..end).ok_or_else(out_of_bounds)?;
        Ok(Self { bytes, offset })
    }

    /// Number of `u32` elements
    pub fn len(&self) -> usize {
        self.bytes.len() / ELEM_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Byte offset of element 0 in linear memory
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        let start = index.checked_mul(ELEM_SIZE)?;
        let chunk = self.bytes.get(start..start.checked_add(ELEM_SIZE)?)?;
        Some(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + 'a {
        self.bytes
            .chunks_exact(ELEM_SIZE)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
    }

    pub fn to_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut bytes = Vec::new();
        for v in [7u32, 0, 1, 2, 3] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_view_reads_le_u32() {
        let bytes = sample();
        let view = MemoryView::new(&bytes, 4, 4).unwrap();
        assert_eq!(view.len(), 4);
        assert_eq!(view.offset(), 4);
        assert_eq!(view.to_vec(), vec![0, 1, 2, 3]);
        assert_eq!(view.get(3), Some(3));
        assert_eq!(view.get(4), None);
    }

    #[test]
    fn test_view_unaligned_offset() {
        let bytes = sample();
        let view = MemoryView::new(&bytes, 1, 1).unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(view.get(0), Some(0));
    }

    #[test]
    fn test_view_must_fit() {
        let bytes = sample();
        let err = MemoryView::new(&bytes, 8, 4).unwrap_err();
        assert_eq!(
            err,
            MemoryError::OutOfBounds {
                offset: 8,
                len: 4,
                byte_len: 20
            }
        );
        assert!(MemoryView::new(&bytes, 0, usize::MAX).is_err());
        assert!(MemoryView::new(&bytes, 20, 0).unwrap().is_empty());
    }
}
