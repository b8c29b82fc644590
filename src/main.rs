use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::process;

use construe::demo;
use construe::interpreter::Interpreter;
use construe::repl::Repl;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "construe")]
#[command(version = VERSION)]
#[command(about = "construe - a typed object-construction script interpreter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Debug level; 1 or higher traces definitions and failed reads
    #[arg(long, global = true, default_value_t = 0)]
    debug: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive REPL
    Repl,

    /// Evaluate a script file
    Run {
        /// Path to the script
        file: String,

        /// Print the resulting environment after evaluation
        #[arg(long)]
        print_env: bool,
    },

    /// List registered factories and their concrete types
    Factories,
}

fn run_file(file: &str, print_env: bool, debug: u32) -> io::Result<()> {
    let mut interp = Interpreter::with_debug(debug);
    if let Err(e) = interp.eval_file(file) {
        eprintln!("{}", e.format());
        process::exit(1);
    }
    if print_env {
        let stdout = io::stdout();
        interp.print_env(&mut stdout.lock())?;
    }
    Ok(())
}

fn list_factories() -> io::Result<()> {
    let interp = Interpreter::new();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    interp.print_factories(&mut out)?;
    out.flush()
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();

    // The binary ships the demo types so scripts have something to build.
    // Embedding hosts register their own instead.
    demo::register_all();

    match cli.command {
        Some(Commands::Repl) | None => {
            Repl::new(cli.debug).run();
            Ok(())
        }
        Some(Commands::Run { file, print_env }) => {
            run_file(&file, print_env, cli.debug)
        }
        Some(Commands::Factories) => list_factories(),
    }
}
