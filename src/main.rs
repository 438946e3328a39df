//! Loopbench - nested-loop wall-clock benchmark
//!
//! Main CLI entry point for running, assembling and emitting benchmark modules.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use loopbench::compile::assemble;
use loopbench::config::{Backend, LoopbenchConfig};
use loopbench::harness::{self, RunConfig, Strategy};
use loopbench::source::{FillLoop, ModuleSource};
use loopbench::write_artifact;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "LOOPBENCH_LOG";

#[derive(Parser)]
#[command(name = "loopbench")]
#[command(version)]
#[command(about = "Nested-loop wall-clock benchmark for wasm and native code", long_about = None)]
struct Cli {
    /// Config file (default: loopbench.toml in this or a parent directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble module text to a binary artifact
    Asm {
        /// Input .wat file (default: the shared-memory benchmark module)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (default: [artifact] path from the config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the resolved configuration
    Config,

    /// Print the built-in benchmark module text
    Emit {
        /// Emit the variant importing a shared env.memory
        #[arg(long)]
        shared: bool,
    },

    /// Run the benchmark once and print elapsed seconds
    Run {
        /// Execution strategy
        #[arg(short, long, value_enum)]
        strategy: Option<Strategy>,

        /// Module text to compile (implies the wat strategy)
        #[arg(short, long, conflicts_with = "artifact")]
        input: Option<PathBuf>,

        /// Pre-built artifact for the artifact strategy
        #[arg(long)]
        artifact: Option<PathBuf>,

        /// Export to invoke
        #[arg(short, long)]
        export: Option<String>,

        /// Compiler backend
        #[arg(long, value_enum)]
        compiler: Option<Backend>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Asm { input, output } => cmd_asm(&config, input.as_ref(), output.as_ref()),
        Commands::Config => cmd_config(&config),
        Commands::Emit { shared } => cmd_emit(shared),
        Commands::Run {
            strategy,
            input,
            artifact,
            export,
            compiler,
        } => cmd_run(&config, strategy, input, artifact, export, compiler),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<LoopbenchConfig> {
    let mut config = match path {
        Some(path) => LoopbenchConfig::load(path).context("Failed to load config")?,
        None => LoopbenchConfig::load_from_cwd().context("Failed to load config")?,
    };
    config.apply_env().context("Invalid environment override")?;
    Ok(config)
}

fn cmd_run(
    config: &LoopbenchConfig,
    strategy: Option<Strategy>,
    input: Option<PathBuf>,
    artifact: Option<PathBuf>,
    export: Option<String>,
    compiler: Option<Backend>,
) -> Result<()> {
    let mut run_config = RunConfig::from_config(config);

    if let Some(input) = input {
        if strategy.is_some_and(|s| s != Strategy::Wat) {
            bail!("--input only applies to the wat strategy");
        }
        let source = ModuleSource::from_file(&input)
            .with_context(|| format!("Failed to read {}", input.display()))?;
        run_config = run_config.strategy(Strategy::Wat).source(source);
    }
    if let Some(strategy) = strategy {
        run_config.strategy = strategy;
    }
    if let Some(artifact) = artifact {
        run_config.artifact = artifact;
    }
    if let Some(export) = export {
        run_config.export = export;
    }
    if let Some(compiler) = compiler {
        run_config.engine.compiler = compiler;
    }

    let report = harness::run(&run_config)?;
    println!("{report}");

    Ok(())
}

fn cmd_asm(
    config: &LoopbenchConfig,
    input: Option<&PathBuf>,
    output: Option<&PathBuf>,
) -> Result<()> {
    let source = match input {
        Some(path) => ModuleSource::from_file(path).context("Failed to read input file")?,
        None => FillLoop::shared_import().render(),
    };

    let wasm = assemble(&source).context("Assembly failed")?;

    let output_path = output.unwrap_or(&config.artifact.path);
    write_artifact(output_path, &wasm).context("Failed to write output")?;
    println!("Wrote {} bytes to {}", wasm.len(), output_path.display());

    Ok(())
}

fn cmd_emit(shared: bool) -> Result<()> {
    let template = if shared {
        FillLoop::shared_import()
    } else {
        FillLoop::benchmark()
    };
    print!("{}", template.render());
    Ok(())
}

fn cmd_config(config: &LoopbenchConfig) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
