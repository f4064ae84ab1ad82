//! scriptterm - run a command and emulate its terminal output
//!
//! Output is written as JSON lines (one chunk per line), as the final
//! visible text, or rendered live on the terminal.
//!
//! # Quick Start
//!
//! ```text
//! scriptterm -- ./build.sh           # JSON chunks on stdout
//! scriptterm -f text -o run.log -- cargo build
//! some-tool | scriptterm -f preview  # read stdin
//! ```

use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use scriptterm::config::{Config, LogConfig, OutputFormat};
use scriptterm::sink::{JsonLinesSink, LogFileSink, PreviewSink, Transcript};
use scriptterm::{OutputSink, Session, TerminalEmulator};

/// Command line options
#[derive(Debug, Default, PartialEq)]
struct Args {
    format: Option<OutputFormat>,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    /// Command and its arguments; stdin is read when empty
    command: Vec<String>,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("scriptterm {}", VERSION);
}

fn print_help() {
    eprintln!("scriptterm {} - terminal output emulator for script runners", VERSION);
    eprintln!();
    eprintln!("Usage: scriptterm [OPTIONS] [-- <command> [args...]]");
    eprintln!();
    eprintln!("Reads standard input when no command is given.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -f, --format <FMT>    json (default), text or preview");
    eprintln!("  -o, --output <PATH>   Write output to PATH instead of stdout");
    eprintln!("  -c, --config <PATH>   Use this config file");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Configuration: ~/.scriptterm/config.toml");
    eprintln!("Logging: RUST_LOG overrides [log] level");
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-f" | "--format" => {
                let value = args.next().ok_or("Missing format argument")?;
                parsed.format = Some(value.parse().map_err(|e| format!("{}", e))?);
            }
            "-o" | "--output" => {
                let value = args.next().ok_or("Missing output path")?;
                parsed.output = Some(PathBuf::from(value));
            }
            "-c" | "--config" => {
                let value = args.next().ok_or("Missing config path")?;
                parsed.config = Some(PathBuf::from(value));
            }
            "--" => {
                parsed.command = args.by_ref().collect();
            }
            flag if flag.starts_with('-') => {
                return Err(format!("Unknown argument: {}. Use -h for help.", flag));
            }
            _ => {
                // First positional argument starts the command
                parsed.command.push(arg.clone());
                parsed.command.extend(args.by_ref());
            }
        }
    }

    Ok(parsed)
}

fn init_logging(log: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.level))
        .with_context(|| format!("invalid log level {:?}", log.level))?;
    let builder = FmtSubscriber::builder().with_env_filter(filter);

    match &log.file {
        Some(path) => {
            // Create log directory if needed
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let subscriber = builder
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = builder.with_writer(io::stderr).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn open_session(args: &Args, config: &Config) -> anyhow::Result<Session> {
    let chunk_size = config.session.read_chunk_size;
    match args.command.split_first() {
        Some((command, rest)) => Ok(Session::spawn(command, rest, chunk_size)?),
        None => {
            info!("no command given, reading stdin");
            Ok(Session::from_reader(io::stdin(), chunk_size))
        }
    }
}

/// Run the session to completion with `sink`, returning the exit code and
/// the closed sink
fn drive<S: OutputSink>(session: Session, sink: S) -> anyhow::Result<(Option<i32>, S)> {
    let mut emulator = TerminalEmulator::new(sink);
    let code = session.run(&mut emulator)?;
    Ok((code, emulator.finish()))
}

fn output_writer(path: Option<&PathBuf>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout().lock()),
    })
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args(env::args().skip(1)) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if let Some(path) = &args.output {
        config.output.path = Some(path.clone());
    }

    init_logging(&config.log)?;
    info!("scriptterm {} starting ({:?})", VERSION, config.output.format);

    let session = open_session(&args, &config)?;
    let path = config.output.path.as_ref();

    let code = match config.output.format {
        OutputFormat::Json => {
            let (code, sink) = drive(session, JsonLinesSink::new(output_writer(path)?))?;
            sink.finish()?;
            code
        }
        OutputFormat::Text => match path {
            Some(path) => {
                let (code, sink) = drive(session, LogFileSink::new(path))?;
                sink.finish()?;
                code
            }
            None => {
                let (code, transcript) = drive(session, Transcript::new())?;
                let mut stdout = io::stdout().lock();
                stdout.write_all(transcript.text().as_bytes())?;
                stdout.flush()?;
                code
            }
        },
        OutputFormat::Preview => {
            let (code, sink) = drive(session, PreviewSink::new(output_writer(path)?))?;
            sink.finish()?;
            code
        }
    };

    info!("finished with exit code {:?}", code);
    match code {
        Some(code) if code != 0 => std::process::exit(code),
        _ => Ok(()),
    }
}
