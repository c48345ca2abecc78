use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use changes_batch::{
    DocumentReport, DocumentStatus, ExitCode, FlattenError, FlattenOutcome, Flattener, Progress,
    RunOptions,
};
use changes_config::{normalize_extension, Config, LoadOptions};
use clap::{ArgAction, Parser, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Flatten LaTeX files by accepting 'changes' package edits",
    long_about = None
)]
struct Cli {
    /// Path to source folder [default: input]
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Path to output folder [default: output]
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Configuration file taking precedence over .changes-flatten.toml
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Descend into subfolders of the source folder
    #[arg(short = 'r', long = "recursive")]
    recursive: bool,

    /// Document extension to process (repeatable)
    #[arg(long = "ext", value_name = "EXT", value_parser = parse_extension)]
    extensions: Vec<String>,

    /// Leave \usepackage{changes} lines active
    #[arg(long = "keep-package")]
    keep_package: bool,

    /// Print diffs without writing the output folder
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Flatten standard input to standard output
    #[arg(long = "stdin", conflicts_with_all = ["input", "output", "dry_run", "recursive"])]
    stdin: bool,

    /// Report format
    #[arg(long = "format", value_enum, default_value_t = ReportFormat::Plain)]
    format: ReportFormat,

    /// Exit with status 1 when a document failed or raised diagnostics
    #[arg(long = "strict")]
    strict: bool,

    /// Suppress the report and log errors only
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    quiet: bool,

    /// Increase logging verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Plain,
    Json,
}

fn parse_extension(raw: &str) -> Result<String, String> {
    normalize_extension(raw).ok_or_else(|| format!("invalid extension '{raw}'"))
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    let exit = match run(&cli) {
        Ok(exit) => exit,
        Err(err) => {
            eprintln!("changes-flatten error: {err:#}");
            err.downcast_ref::<FlattenError>()
                .map(FlattenError::exit_code)
                .unwrap_or(ExitCode::Io)
        }
    };

    std::process::ExitCode::from(exit as u8)
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = load_config(cli)?;
    debug!(layers = config.sources.layers.len(), "configuration loaded");
    let flattener = Flattener::new(config);

    if cli.stdin {
        return run_stdin(cli, &flattener);
    }

    let options = RunOptions {
        dry_run: cli.dry_run,
    };
    let streaming = cli.format == ReportFormat::Plain && !cli.quiet;
    if streaming {
        emit("--- LaTeX Changes Cleaner ---\n")?;
    }

    let outcome = flattener.run_with_progress(&options, |event| {
        if streaming {
            show_progress(event, flattener.config());
        }
    })?;

    match cli.format {
        ReportFormat::Json => {
            let rendered = serde_json::to_string_pretty(&outcome)?;
            emit(&format!("{rendered}\n"))?;
        }
        ReportFormat::Plain if streaming => {
            emit(&render_summary(&outcome, flattener.config()))?;
        }
        ReportFormat::Plain => {}
    }

    if cli.strict && !outcome.is_clean() {
        return Ok(ExitCode::Incomplete);
    }
    Ok(ExitCode::Success)
}

fn load_config(cli: &Cli) -> Result<Config, FlattenError> {
    let mut options = LoadOptions::default();
    if let Some(path) = &cli.config {
        options = options.with_override_path(path);
    }
    let mut config = Config::load(options)?;

    let working_dir = config.sources.working_directory.clone();
    if let Some(input) = &cli.input {
        config.paths.input = working_dir.join(input);
    }
    if let Some(output) = &cli.output {
        config.paths.output = working_dir.join(output);
    }
    if cli.recursive {
        config.scan.recursive = true;
    }
    if !cli.extensions.is_empty() {
        config.scan.extensions = cli.extensions.clone();
    }
    if cli.keep_package {
        config.rewrite.comment_out_package = false;
    }

    Ok(config)
}

/// Diagnostics reach stderr through the resolver's warnings.
fn run_stdin(cli: &Cli, flattener: &Flattener) -> Result<ExitCode> {
    let stdin = io::stdin();
    let resolution = flattener.flatten_reader(&mut stdin.lock())?;

    emit(&resolution.text)?;

    if cli.strict && !resolution.is_clean() {
        return Ok(ExitCode::Incomplete);
    }
    Ok(ExitCode::Success)
}

/// Prints one progress block with a single write so that blocks from
/// concurrent workers never interleave.
fn show_progress(event: Progress<'_>, config: &Config) {
    let block = match event {
        Progress::OutputCreated(output) => format!(
            "Created output directory: {}\n",
            display_path(output, &config.sources.working_directory)
        ),
        Progress::Document(document) => {
            let mut block = String::new();
            render_document(&mut block, document);
            block
        }
    };
    if let Err(err) = emit(&block) {
        debug!("progress output failed: {err:#}");
    }
}

fn render_summary(outcome: &FlattenOutcome, config: &Config) -> String {
    let working_dir = &config.sources.working_directory;
    let input = display_path(&outcome.input, working_dir);
    let output = display_path(&outcome.output, working_dir);
    let ext = config
        .scan
        .extensions
        .first()
        .map(String::as_str)
        .unwrap_or("tex");

    if outcome.input_created {
        return format!(
            "Input directory '{input}' not found.\n\
             Created '{input}' for you. Please place your .{ext} files inside it and run again.\n"
        );
    }

    if outcome.documents.is_empty() {
        return format!("No .{ext} files found in '{input}/'. Please add your files there.\n");
    }

    let mut out = format!("\nDone! {} .{ext} files processed.\n", outcome.processed);
    if outcome.failed > 0 {
        out.push_str(&format!("{} files failed.\n", outcome.failed));
    }
    if outcome.dry_run {
        out.push_str("Dry run: nothing was written.\n");
    } else {
        out.push_str(&format!("Clean files are located in: {output}/\n"));
    }

    out
}

fn render_document(out: &mut String, document: &DocumentReport) {
    out.push_str(&format!(
        "Processing: {}...\n",
        document.relative.display()
    ));

    for diagnostic in &document.diagnostics {
        out.push_str(&format!(
            "  [Warning] line {}: {diagnostic}\n",
            diagnostic.line
        ));
    }

    if let DocumentStatus::Failed { message } = &document.status {
        out.push_str(&format!(
            "  [Error] Failed to process {}: {message}\n",
            document.relative.display()
        ));
    }

    if let Some(diff) = &document.diff {
        out.push_str(diff);
        if !diff.ends_with('\n') {
            out.push('\n');
        }
    }
}

fn display_path(path: &Path, working_dir: &Path) -> String {
    path.strip_prefix(working_dir)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn emit(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match handle.write_all(text.as_bytes()).and_then(|_| handle.flush()) {
        Ok(()) => Ok(()),
        Err(err) if should_ignore_pipe_error(&err) => Ok(()),
        Err(err) => Err(err).context("Failed to write stdout"),
    }
}

fn should_ignore_pipe_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::WouldBlock
    )
}
