use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tinybasic_codegen::lower;
use tinybasic_common::{FileId, SourceDb, Span};
use tinybasic_interp::{Interpreter, InterpreterConfig};
use tinybasic_lexer::tokenize;
use tinybasic_parser::parse;
use tinybasic_sema::analyze;

#[derive(Parser)]
#[command(name = "tinybasic")]
#[command(about = "TinyBasic interpreter and three-address code generator")]
#[command(version)]
struct Cli {
    /// Input .bas source file
    source: PathBuf,

    /// Log interpreter and lowering steps (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token stream
    Tokens,

    /// Check syntax and line targets without running
    Check,

    /// Run the program
    Run {
        /// Prompt written before each INPUT value
        #[arg(long, default_value = "? ")]
        prompt: String,
    },

    /// Print the three-address code listing
    Tac,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let source = std::fs::read_to_string(&cli.source)
        .with_context(|| format!("failed to read {}", cli.source.display()))?;

    let mut files = SourceDb::new();
    let file_id = files.add(cli.source.display().to_string(), source.clone());
    let reporter = Reporter::new(&files);

    // Lex
    let tokens = match tokenize(&source) {
        Ok(t) => t,
        Err(e) => {
            reporter.emit(&error_diagnostic(file_id, e.span, &e.message))?;
            std::process::exit(1);
        }
    };

    if let Commands::Tokens = cli.command {
        for token in &tokens {
            println!("{}:{}\t{}", token.line, token.column, token.describe());
        }
        return Ok(());
    }

    // Parse
    let program = match parse(tokens) {
        Ok(p) => p,
        Err(e) => {
            reporter.emit(&error_diagnostic(file_id, e.span, &e.message))?;
            std::process::exit(1);
        }
    };

    debug!(lines = program.len(), "parsed program");

    // Semantic analysis
    let sema_result = analyze(&program);
    for diag in sema_result.to_diagnostics(file_id) {
        reporter.emit(&diag)?;
    }
    if sema_result.has_errors() {
        std::process::exit(1);
    }

    match cli.command {
        Commands::Tokens => {}
        Commands::Check => {
            println!(
                "OK: {} ({} lines, {} variables)",
                cli.source.display(),
                program.len(),
                sema_result.symbols.len()
            );
        }
        Commands::Run { prompt } => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            let mut interp = Interpreter::with_config(
                stdin.lock(),
                stdout.lock(),
                InterpreterConfig { prompt },
            );
            let result = interp.run(&program);
            for warning in interp.warnings() {
                reporter.emit(&warning.to_diagnostic(file_id))?;
            }
            if let Err(e) = result {
                reporter.emit(&e.to_diagnostic(file_id))?;
                std::process::exit(1);
            }
        }
        Commands::Tac => match lower(&program, sema_result.symbols) {
            Ok(tac) => print!("{}", tac.listing()),
            Err(e) => {
                reporter.emit(&e.to_diagnostic(file_id))?;
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

/// Renders diagnostics against the source file on stderr.
struct Reporter<'a> {
    files: &'a SourceDb,
    writer: StandardStream,
    config: term::Config,
}

impl<'a> Reporter<'a> {
    fn new(files: &'a SourceDb) -> Self {
        Self {
            files,
            writer: StandardStream::stderr(ColorChoice::Auto),
            config: term::Config::default(),
        }
    }

    fn emit(&self, diagnostic: &Diagnostic<FileId>) -> Result<()> {
        term::emit(&mut self.writer.lock(), &self.config, self.files, diagnostic)?;
        Ok(())
    }
}

fn error_diagnostic(file_id: FileId, span: Span, message: &str) -> Diagnostic<FileId> {
    Diagnostic::error()
        .with_message(message)
        .with_labels(vec![
            Label::primary(file_id, span.to_range()).with_message(message)
        ])
}
