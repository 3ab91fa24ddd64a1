use std::ffi::CStr;
use std::fs::File;
use std::os::raw::{c_char, c_int};
use std::path::PathBuf;
use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self},
    prelude::*,
    util::TryInitError,
};

pub const LOGGING_OK: c_int = 0;
pub const LOGGING_INVALID_ARGUMENT: c_int = -1;
pub const LOGGING_ALREADY_INITIALIZED: c_int = -2;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("A global logger is already installed: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

fn level_filter(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::OFF;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Builds the adapter's subscriber: compact records on stderr and, when a
/// file is given, full records with thread ids and targets in that file.
pub fn build_subscriber(
    verbosity: u8,
    quiet: bool,
    log_file: Option<File>,
) -> impl Subscriber + Send + Sync + 'static {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .compact();

    let file_layer = log_file.map(|file| {
        fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_thread_ids(true)
            .with_target(true)
    });

    tracing_subscriber::registry()
        .with(level_filter(verbosity, quiet))
        .with(stderr_layer)
        .with(file_layer)
}

pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<(), LoggingError> {
    let file = log_file.map(File::create).transpose()?;
    build_subscriber(verbosity, quiet, file).try_init()?;
    Ok(())
}

/// Installs a global logger for the adapter's diagnostics.
///
/// `verbosity` 0-3 selects WARN, INFO, DEBUG or TRACE; `quiet` disables
/// logging. `log_file` may be NULL. Returns 0 on success, -1 for an unusable
/// path and -2 if a logger is already installed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn xtb_ffi_init_logging(
    verbosity: u8,
    quiet: bool,
    log_file: *const c_char,
) -> c_int {
    let log_file = if log_file.is_null() {
        None
    } else {
        match unsafe { CStr::from_ptr(log_file) }.to_str() {
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => return LOGGING_INVALID_ARGUMENT,
        }
    };

    match setup_logging(verbosity, quiet, log_file) {
        Ok(()) => LOGGING_OK,
        Err(LoggingError::Io(_)) => LOGGING_INVALID_ARGUMENT,
        Err(LoggingError::AlreadyInitialized(_)) => LOGGING_ALREADY_INITIALIZED,
    }
}
