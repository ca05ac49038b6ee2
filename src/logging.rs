//! Structured logging setup using tracing.
//!
//! Stdout always gets a text or JSON layer; when file logging is configured a
//! JSON layer is added on a rolling, non-blocking file writer. A background
//! task gzips rotated files and prunes old ones.

use crate::config::{FileLoggingConfig, LogFormat, LogRotation, LoggingConfig};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Keeps the file writer alive; dropping it flushes pending lines.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global subscriber.
pub fn init_logging(config: &LoggingConfig) -> LogGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stdout_layer = match config.format {
        LogFormat::Text => fmt::layer().with_writer(io::stdout).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(io::stdout).boxed(),
    };

    let (file_layer, file_guard) = match &config.file {
        Some(file_config) => {
            let (writer, guard) = create_file_writer(file_config);
            (Some(fmt::layer().json().with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    LogGuard {
        _file_guard: file_guard,
    }
}

fn create_file_writer(config: &FileLoggingConfig) -> (NonBlocking, WorkerGuard) {
    if let Err(e) = fs::create_dir_all(&config.log_dir) {
        eprintln!("Warning: cannot create log directory {}: {}", config.log_dir, e);
    }

    let rotation = match config.rotation {
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Never => Rotation::NEVER,
    };

    let file_appender = RollingFileAppender::new(rotation, &config.log_dir, &config.file_prefix);

    tracing_appender::non_blocking(file_appender)
}

/// Spawn the compress/prune task when file logging is on.
pub fn spawn_log_maintenance(config: &LoggingConfig) {
    let Some(file_config) = config.file.clone() else {
        return;
    };
    if !file_config.compress && file_config.max_age_days == 0 {
        return;
    }

    tokio::spawn(async move {
        // First pass shortly after startup, then hourly to catch rotations
        tokio::time::sleep(Duration::from_secs(60)).await;
        loop {
            run_log_maintenance(&file_config);
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    });
}

fn run_log_maintenance(config: &FileLoggingConfig) {
    let dir = Path::new(&config.log_dir);
    if config.compress {
        compress_rotated_logs(dir, &config.file_prefix, &active_log_name(config));
    }
    if config.max_age_days > 0 {
        let max_age = Duration::from_secs(config.max_age_days * 24 * 60 * 60);
        cleanup_old_logs(dir, &config.file_prefix, max_age);
    }
}

/// Name tracing-appender is currently writing to (UTC based)
fn active_log_name(config: &FileLoggingConfig) -> String {
    let now = chrono::Utc::now();
    match config.rotation {
        LogRotation::Daily => format!("{}{}", config.file_prefix, now.format(".%Y-%m-%d")),
        LogRotation::Hourly => format!("{}{}", config.file_prefix, now.format(".%Y-%m-%d-%H")),
        LogRotation::Never => config.file_prefix.clone(),
    }
}

/// Files in `dir` belonging to this logger
fn log_files(dir: &Path, file_prefix: &str) -> Vec<(PathBuf, String)> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Failed to read log directory");
            return Vec::new();
        }
    };

    entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            name.starts_with(file_prefix).then_some((path, name))
        })
        .collect()
}

/// Gzip every rotated file except the active one.
fn compress_rotated_logs(dir: &Path, file_prefix: &str, active: &str) {
    for (path, name) in log_files(dir, file_prefix) {
        if name == file_prefix || name == active || name.ends_with(".gz") {
            continue;
        }

        match compress_file(&path) {
            Ok(gz_path) => {
                tracing::info!(path = %gz_path.display(), "Compressed rotated log file");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to compress log file");
            }
        }
    }
}

/// Compress `path` to `<path>.gz` and remove the original.
fn compress_file(path: &Path) -> io::Result<PathBuf> {
    let mut gz_name = path.as_os_str().to_os_string();
    gz_name.push(".gz");
    let gz_path = PathBuf::from(gz_name);

    let mut reader = BufReader::new(File::open(path)?);
    let writer = BufWriter::new(File::create(&gz_path)?);
    let mut encoder = GzEncoder::new(writer, Compression::default());

    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?;

    fs::remove_file(path)?;
    Ok(gz_path)
}

/// Delete log files last modified more than `max_age` ago.
fn cleanup_old_logs(dir: &Path, file_prefix: &str, max_age: Duration) {
    for (path, name) in log_files(dir, file_prefix) {
        if name == file_prefix {
            continue;
        }

        let age = match path
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        {
            Some(age) => age,
            None => continue,
        };

        if age <= max_age {
            continue;
        }

        if let Err(e) = fs::remove_file(&path) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to delete old log file");
        } else {
            tracing::info!(path = %path.display(), age_days = age.as_secs() / 86400, "Deleted old log file");
        }
    }
}
