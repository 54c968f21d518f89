//! jsonlisp command line interface
//!
//! Main entry point for the `jsonlisp` command.

use clap::{Parser, Subcommand};
use jsonlisp::{Environment, Interpreter, MacroTable, Value, parse_json};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "jsonlisp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A minimal Lisp whose programs are JSON data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Start without the bundled `let` and `->` macros
    #[arg(long, global = true)]
    no_prelude: bool,

    /// Stack size of the evaluation thread, in MiB
    #[arg(long, value_name = "MIB", default_value_t = 64, global = true)]
    stack_size: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate files, each a JSON array of top-level forms, in one context
    Run {
        /// Input files
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Evaluate a single form given as JSON
    Eval {
        /// The form, e.g. '["+", 1, 2]'
        #[arg(value_name = "JSON")]
        source: String,
    },

    /// Start the interactive REPL
    Repl,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path}: expected a JSON array of forms, got {found}")]
    NotAProgram { path: PathBuf, found: &'static str },
    #[error(transparent)]
    Eval(#[from] jsonlisp::Error),
    #[error("line editor: {0}")]
    Readline(#[from] ReadlineError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Interpreted recursion is native recursion, so evaluation gets its own,
    // configurable stack.
    let stack_bytes = cli.stack_size.saturating_mul(1024 * 1024);
    let spawned = thread::Builder::new()
        .name("jsonlisp-eval".to_owned())
        .stack_size(stack_bytes)
        .spawn(move || execute(cli));

    match spawned.map(thread::JoinHandle::join) {
        Ok(Ok(Ok(()))) => ExitCode::SUCCESS,
        Ok(Ok(Err(err))) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
        Ok(Err(_)) => {
            eprintln!("error: evaluation thread panicked");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: failed to start evaluation thread: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "jsonlisp=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn execute(cli: Cli) -> Result<(), CliError> {
    let mut interpreter = Interpreter::new();
    if !cli.no_prelude {
        interpreter.load_prelude()?;
    }

    match cli.command {
        Commands::Run { files } => run(&interpreter, &files),
        Commands::Eval { source } => {
            let form = parse_json(&source)?;
            print_value(&interpreter.evaluate(&form)?);
            Ok(())
        }
        Commands::Repl => repl(&mut interpreter),
    }
}

fn run(interpreter: &Interpreter, files: &[PathBuf]) -> Result<(), CliError> {
    let mut last = Value::Undefined;
    for path in files {
        let forms = read_program(path)?;
        tracing::debug!("Evaluating {} forms from {:?}", forms.len(), path);
        last = interpreter.evaluate_all(&forms)?;
    }
    print_value(&last);
    Ok(())
}

fn read_program(path: &Path) -> Result<Vec<Value>, CliError> {
    let source = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_owned(),
        source,
    })?;

    match parse_json(&source)? {
        Value::List(forms) => Ok(forms),
        other => Err(CliError::NotAProgram {
            path: path.to_owned(),
            found: other.type_name(),
        }),
    }
}

/// Print a result; `undefined` (from `define`, `print`, ...) is not shown
fn print_value(value: &Value) {
    if !matches!(value, Value::Undefined) {
        println!("{value}");
    }
}

fn repl(interpreter: &mut Interpreter) -> Result<(), CliError> {
    println!("jsonlisp {}", env!("CARGO_PKG_VERSION"));
    println!("Enter forms as JSON, like: [\"+\", 1, 2]");
    println!("Type :help for more commands, or Ctrl+D to exit.");
    println!();

    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline("jsonlisp> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                match line {
                    ":help" => print_help(),
                    ":env" => print_environment(interpreter.env()),
                    ":macros" => print_macros(interpreter.macros()),
                    ":reset" => {
                        interpreter.reset()?;
                        println!("All definitions cleared.");
                    }
                    ":quit" | ":exit" => break,
                    _ => match parse_json(line).and_then(|form| interpreter.evaluate(&form)) {
                        Ok(value) => print_value(&value),
                        Err(e) => println!("Error: {e}"),
                    },
                }
            }
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => break,
            Err(err) => return Err(err.into()),
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  :help    - Show this help message");
    println!("  :env     - Show current environment bindings");
    println!("  :macros  - Show registered macros");
    println!("  :reset   - Forget every definition");
    println!("  :quit    - Exit the interpreter");
    println!();
    println!("Special forms: quote, do, fn, if, define, define-syntax");
    println!("Functions: + - * / = > < >= <= not print array append slice get");
    println!();
    println!("Examples:");
    println!("  [\"define\", \"square\", [\"fn\", [\"x\"], [\"*\", \"x\", \"x\"]]]");
    println!("  [\"square\", 12]");
    println!("  [\"let\", [\"x\", 2, \"y\", 3], [\"+\", \"x\", \"y\"]]");
    println!("  [\"->\", 10, [\"*\", 9], [\"/\", 5], [\"+\", 32]]");
    println!();
}

fn print_environment(env: &Environment) {
    let bindings = env.get_all_bindings();

    if bindings.is_empty() {
        println!("Environment is empty.");
        return;
    }

    let mut natives = Vec::new();
    let mut user_defined = Vec::new();
    for (name, value) in bindings {
        match value {
            Value::NativeFunction { .. } => natives.push(name),
            _ => user_defined.push((name, value)),
        }
    }

    if !natives.is_empty() {
        println!("Native functions ({}):", natives.len());
        for row in natives.chunks(6) {
            let line: String = row.iter().map(|name| format!("  {name:<10}")).collect();
            println!("{}", line.trim_end());
        }
        println!();
    }

    if !user_defined.is_empty() {
        println!("User-defined values ({}):", user_defined.len());
        for (name, value) in user_defined {
            println!("  {name} = {value}");
        }
    }
}

fn print_macros(menv: &MacroTable) {
    let names = menv.names();
    if names.is_empty() {
        println!("No macros defined.");
    } else {
        println!("Macros ({}): {}", names.len(), names.join(" "));
    }
}
