use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use rox::{
    ast::Stmt,
    diagnostics,
    environment::WrappedEnvironment,
    error::EvaluationResult,
    interpreter::Interpreter,
    parse_source_code, pretty,
    value::Value,
    FrontendError,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "rox", version, about = "Run a Rox script, or start a REPL")]
struct Cli {
    /// Script to run. Without one, lines are read from stdin.
    script: Option<PathBuf>,

    /// Print the parsed program instead of running it
    #[arg(long)]
    dump_ast: bool,

    /// Tracing filter directive, e.g. "debug" or "rox::interpreter=trace" (overrides RUST_LOG)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match &cli.script {
        Some(path) => run_file(path, &cli),
        None => run_prompt(&cli),
    }
}

fn init_tracing(directive: Option<&str>) {
    let filter = match directive {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn run_file(file_path: &Path, cli: &Cli) -> Result<()> {
    let source = fs::read_to_string(file_path)
        .with_context(|| format!("could not read script {}", file_path.display()))?;

    let mut interpreter = Interpreter::stdout();
    let globals = interpreter.globals();
    run(&source, cli, &mut interpreter, &globals, |interpreter, statements, env| {
        interpreter.evaluate_each(statements, env, |error| eprintln!("{error}"));
        Ok(())
    });
    Ok(())
}

fn run_prompt(cli: &Cli) -> Result<()> {
    let mut interpreter = Interpreter::stdout();
    let globals = interpreter.globals();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        run(&line?, cli, &mut interpreter, &globals, |interpreter, statements, env| {
            let mut last = Value::Nil;
            for statement in statements {
                last = interpreter.evaluate_statement(statement, env)?;
            }
            if last != Value::Nil {
                println!("{}", last.repr());
            }
            Ok(())
        });
    }
    println!();
    Ok(())
}

/// Front end, then `execute` unless `--dump-ast` was given. Every error is
/// reported on stderr; none of them end the process.
fn run<W, F>(
    source: &str,
    cli: &Cli,
    interpreter: &mut Interpreter<W>,
    env: &WrappedEnvironment,
    execute: F,
) where
    W: Write,
    F: FnOnce(&mut Interpreter<W>, &[Stmt], &WrappedEnvironment) -> EvaluationResult<()>,
{
    let statements = match parse_source_code(source) {
        Ok(statements) => statements,
        Err(errors) => {
            report_frontend_errors(source, &errors);
            return;
        }
    };

    if cli.dump_ast {
        statements
            .iter()
            .for_each(|stmt| println!("{}", pretty::print_stmt(stmt)));
        return;
    }

    if let Err(error) = execute(interpreter, &statements, env) {
        eprintln!("{error}");
    }
}

fn report_frontend_errors(source: &str, errors: &[FrontendError]) {
    for error in errors {
        eprintln!("{}", diagnostics::render(source, error.span(), error));
    }
}
