//! Standalone assembler for Loopbench
//!
//! Converts WebAssembly text to a binary module.

use anyhow::{Context, Result};
use clap::Parser;
use loopbench::compile::assemble;
use loopbench::source::ModuleSource;
use loopbench::write_artifact;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "loopbench-asm")]
#[command(about = "WebAssembly text assembler")]
struct Args {
    /// Input file (use - for stdin)
    #[arg(default_value = "-")]
    input: String,

    /// Output file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output as hex instead of binary
    #[arg(long)]
    hex: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Read input
    let source = if args.input == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        ModuleSource::new(buf)
    } else {
        ModuleSource::new(fs::read_to_string(&args.input).context("Failed to read input")?)
    };

    let wasm = assemble(&source).context("Assembly failed")?;
    eprintln!("Assembled {} bytes", wasm.len());

    // Output
    if let Some(output) = args.output {
        if args.hex {
            fs::write(&output, hex::encode(&wasm))?;
        } else {
            write_artifact(&output, &wasm)?;
        }
        eprintln!("Wrote {} bytes to {}", wasm.len(), output.display());
    } else if args.hex {
        println!("{}", hex::encode(&wasm));
    } else {
        io::stdout().write_all(&wasm)?;
    }

    Ok(())
}
