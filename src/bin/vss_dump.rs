//! CLI surface (spec.md §6): walks a VSS database and writes a
//! human-readable dump of its records and reconstructed actions.
//!
//! Not part of the core decoder/reconstruction library — CLI argument
//! parsing and log formatting are explicitly out of scope for that core
//! (spec.md §1) and live here instead.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use encoding_rs::Encoding;
use log::{LevelFilter, Log, Metadata, Record as LogRecord};

use vss_reader::dump::{self, DumpVerbosity};
use vss_reader::error::Error;
use vss_reader::fullname::PhysicalName;
use vss_reader::options::{ParseMode, ParseOptions};
use vss_reader::{walker, Database};

#[derive(Parser, Debug)]
#[command(
    name = "vss_dump",
    about = "Dumps a legacy Visual SourceSafe database's reconstructed history"
)]
struct Args {
    /// Root directory of the VSS database (containing `srcsafe.ini`).
    database_path: PathBuf,

    /// Write log messages to this file instead of stderr. The dump's own
    /// output (the reconstructed action stream) always goes to stdout.
    #[arg(long)]
    log: Option<PathBuf>,

    /// Code page the database's strings are stored in: `mbcs` (the host
    /// ANSI code page, approximated here as Windows-1252), a numeric
    /// code page (`1252`, `1250`, ...), or `utf-8` for test fixtures.
    #[arg(long, default_value = "mbcs")]
    encoding: String,

    /// Physical name of the root project to open.
    #[arg(long, default_value = "AAAAAAAA")]
    root_project_file: String,

    /// Downgrade CRC mismatches and unknown signatures/actions to
    /// logged warnings instead of failing.
    #[arg(long)]
    lenient: bool,

    /// Repeatable: -v for decoded fields, -vv for raw header/offset
    /// detail.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn resolve_encoding(name: &str) -> Result<&'static Encoding, Error> {
    match name.to_ascii_lowercase().as_str() {
        "mbcs" | "1252" | "windows-1252" | "cp1252" => Ok(encoding_rs::WINDOWS_1252),
        "1250" | "windows-1250" | "cp1250" => Ok(encoding_rs::WINDOWS_1250),
        "1251" | "windows-1251" | "cp1251" => Ok(encoding_rs::WINDOWS_1251),
        "utf-8" | "utf8" => Ok(encoding_rs::UTF_8),
        other => Err(Error::InvalidEncoding(format!("unrecognized code page {other:?}"))),
    }
}

/// A minimal `log::Log` that appends leveled lines to a file.
/// `stderrlog` (used for the default, stderr-bound case below) only ever
/// writes to stderr, so `--log` needs this small tee of its own to
/// redirect log output to a file instead.
struct FileLogger {
    file: Mutex<File>,
    level: LevelFilter,
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &LogRecord) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{} [{}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

/// Maps the repeated `-v` count to a `log` level filter, matching
/// `run`'s own `DumpVerbosity::from_count` tiering.
fn level_filter(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Initializes logging per spec.md §6/SPEC_FULL.md §4: `stderrlog` to
/// stderr by default, or this module's own `FileLogger` when `--log`
/// names a file.
fn init_logging(args: &Args) {
    let level = level_filter(args.verbose);
    match &args.log {
        Some(path) => {
            let file = match File::create(path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("failed to open log file {}: {e}", path.display());
                    std::process::exit(1);
                }
            };
            log::set_boxed_logger(Box::new(FileLogger {
                file: Mutex::new(file),
                level,
            }))
            .expect("logger already initialized");
            log::set_max_level(level);
        }
        None => {
            // stderrlog's own verbosity scale: 0 = error, 1 = warn, 2 =
            // info, 3 = debug, 4 = trace.
            let stderrlog_verbosity = match args.verbose {
                0 => 2,
                1 => 3,
                _ => 4,
            };
            stderrlog::new()
                .module(module_path!())
                .verbosity(stderrlog_verbosity)
                .init()
                .expect("logger already initialized");
        }
    }
}

fn run(args: &Args, sink: &mut dyn Write) -> Result<(), Error> {
    let encoding = resolve_encoding(&args.encoding)?;
    let parse_mode = if args.lenient {
        ParseMode::Permissive
    } else {
        ParseMode::Strict
    };
    let options = ParseOptions::new().with_parse_mode(parse_mode);
    let verbosity = DumpVerbosity::from_count(args.verbose);

    let db = Database::open(&args.database_path, encoding, options)?;
    let root_physical_name = PhysicalName::from_str(&args.root_project_file)?;
    let root = db.open_project(root_physical_name)?;
    let actions = walker::walk_project(&db, &root, true)?;

    for action in &actions {
        dump::dump_action(sink, action, verbosity).map_err(Error::Io)?;
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(&args);

    let mut stdout = io::stdout();
    if let Err(e) = run(&args, &mut stdout) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
