use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::interpreter::Mode;
use crate::registry::AstRegistry;
use crate::rewriter::print_instrumented;
use crate::runtime::{ops, Runtime};
use crate::stack::{Continuation, Outcome};
use crate::syntax::{parse_program, Program};

#[derive(Parser)]
#[command(name = "reify")]
#[command(about = "Reify - resumable execution for instrumented scripts", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Instrument and run a script, reporting pauses
    Run {
        /// Script to run
        file: PathBuf,

        /// Resume automatically after each pause
        #[arg(long)]
        resume: bool,

        /// Give up after this many automatic resumes
        #[arg(long, default_value = "16")]
        max_resumes: usize,
    },

    /// Print the instrumented form of a script
    Rewrite {
        /// Script to rewrite
        file: PathBuf,

        /// Registry namespace (overrides config)
        #[arg(short = 'n', long = "namespace")]
        namespace: Option<String>,
    },

    /// Run a script through the stepping interpreter without instrumentation
    Interpret {
        /// Script to run
        file: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

/// Run the CLI with provided arguments
pub fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli)
}

fn run_cli_with_args(cli: Cli) -> Result<()> {
    use std::env;

    if let Some(config_path) = &cli.config {
        env::set_var("REIFY_CONFIG_PATH", config_path);
    }

    let mut config = Config::load().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .ok();

    match cli.command {
        Commands::Run {
            file,
            resume,
            max_resumes,
        } => {
            let program = load_program(&file)?;
            let mut rt = Runtime::new(config);
            let registry = AstRegistry::handle();
            let mut outcome = rt
                .run_program(&program, &registry)
                .context("Failed to instrument script")?;
            let mut resumes = 0;

            loop {
                flush_output(&mut rt);
                match outcome {
                    Outcome::Completed(value) => {
                        println!("=> {}", ops::inspect(&value));
                        break;
                    }
                    Outcome::Failed(failure) => {
                        print_frames("Uncaught error", &failure.continuation);
                        bail!("Uncaught {}", ops::inspect(&failure.error));
                    }
                    Outcome::Paused(continuation) => {
                        print_frames("Paused", &continuation);
                        if !resume {
                            break;
                        }
                        if resumes == max_resumes {
                            bail!("Still paused after {} resumes", max_resumes);
                        }
                        resumes += 1;
                        outcome = continuation
                            .resume(&mut rt)
                            .context("Failed to resume script")?;
                    }
                }
            }
        }

        Commands::Rewrite { file, namespace } => {
            if let Some(namespace) = namespace {
                config.namespace = namespace;
            }
            let program = load_program(&file)?;
            let mut rt = Runtime::new(config);
            let registry = AstRegistry::handle();
            let compiled = rt
                .compile_program(&program, &registry)
                .context("Failed to instrument script")?;
            print!("{}", print_instrumented(&compiled));
        }

        Commands::Interpret { file } => {
            let program = load_program(&file)?;
            let mut rt = Runtime::new(config);
            let registry = AstRegistry::handle();
            let outcome = rt
                .interpret(&program, &registry, Mode::Plain)
                .context("Failed to interpret script")?;
            flush_output(&mut rt);
            match outcome {
                Outcome::Completed(value) => println!("=> {}", ops::inspect(&value)),
                Outcome::Failed(failure) => bail!("Uncaught {}", ops::inspect(&failure.error)),
                Outcome::Paused(continuation) => print_frames("Paused", &continuation),
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml().context("Failed to render configuration")?);
        }
    }

    Ok(())
}

fn load_program(file: &Path) -> Result<Program> {
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let program =
        parse_program(&source).with_context(|| format!("Failed to parse {}", file.display()))?;
    Ok(program)
}

fn flush_output(rt: &mut Runtime) {
    for line in rt.take_output() {
        println!("{}", line);
    }
}

fn print_frames(heading: &str, continuation: &Continuation) {
    println!("{}:", heading);
    for frame in continuation.frames() {
        println!("  at {}", frame.describe());
    }
}
