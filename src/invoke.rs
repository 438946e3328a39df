//! Entry-point invocation
//!
//! Calls one zero-argument export of an [`Instance`] and times the call.
//! Export lookup and signature checks happen before the clock starts, so
//! the measured interval covers the guest call only.

use crate::instance::Instance;
use std::time::{Duration, Instant};
use thiserror::Error;
use wasmtime::Extern;

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("export `{0}` not found")]
    MissingExport(String),
    #[error("export `{export}` is not a function taking and returning nothing: {reason}")]
    Signature { export: String, reason: String },
    #[error("export `{export}` trapped: {message}")]
    Trap {
        export: String,
        /// Trap code, when the runtime reported one
        code: Option<wasmtime::Trap>,
        message: String,
    },
}

/// Result of one timed call
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub export: String,
    pub elapsed: Duration,
}

impl Invocation {
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Call `export` once and measure wall-clock time around the call
pub fn invoke(instance: &mut Instance, export: &str) -> Result<Invocation, InvokeError> {
    let func = match instance.instance.get_export(&mut instance.store, export) {
        Some(Extern::Func(func)) => func,
        Some(_) => {
            return Err(InvokeError::Signature {
                export: export.to_string(),
                reason: "export is not a function".to_string(),
            })
        }
        None => return Err(InvokeError::MissingExport(export.to_string())),
    };
    let func = func
        .typed::<(), ()>(&instance.store)
        .map_err(|e| InvokeError::Signature {
            export: export.to_string(),
            reason: format!("{e:#}"),
        })?;

    tracing::debug!(export, "invoking");
    let start = Instant::now();
    let result = func.call(&mut instance.store, ());
    let elapsed = start.elapsed();

    result.map_err(|e| InvokeError::Trap {
        export: export.to_string(),
        code: e.downcast_ref::<wasmtime::Trap>().copied(),
        message: format!("{e:#}"),
    })?;

    tracing::debug!(export, elapsed_us = elapsed.as_micros() as u64, "invoked");
    Ok(Invocation {
        export: export.to_string(),
        elapsed,
    })
}
