//! Native baseline
//!
//! The fill loop written directly in Rust over a `u32` buffer. This is the
//! host-language variant the wasm strategies are read against.

use std::hint::black_box;
use std::time::{Duration, Instant};

/// Outcome of a native run
#[derive(Debug, Clone)]
pub struct NativeRun {
    pub elapsed: Duration,
    pub buffer: Vec<u32>,
}

/// Run `outer` passes of `buffer[i] = i`
pub fn fill_loop(buffer: &mut [u32], outer: u32) {
    for _ in 0..outer {
        for (i, slot) in buffer.iter_mut().enumerate() {
            *slot = i as u32;
        }
        // Keep each pass observable so the outer loop is not collapsed.
        black_box(&mut *buffer);
    }
}

/// Allocate an `inner`-slot buffer and time the loop over it
pub fn run(outer: u32, inner: u32) -> NativeRun {
    let mut buffer = vec![0u32; inner as usize];

    let start = Instant::now();
    fill_loop(&mut buffer, black_box(outer));
    let elapsed = start.elapsed();

    tracing::debug!(outer, inner, elapsed_us = elapsed.as_micros() as u64, "native loop");
    NativeRun { elapsed, buffer }
}
