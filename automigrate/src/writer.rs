use crate::common::{unix_timestamp, MAX_FILENAME_ATTEMPTS};
use crate::errors::{AutomigrateError, AutomigrateResult, ErrorKind};
use log::{debug, warn};
use parking_lot::Mutex;
use regex::Regex;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const UNSAFE_FILENAME_CHARS: &str = r"[^A-Za-z0-9_\-]+";

type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

/// Writes rendered migrations as `<timestamp>_<label>.<extension>` files.
///
/// Timestamps handed out by one writer strictly increase, even when the
/// clock does not advance between two writes, so file names sort in the
/// order the migrations were produced. A file is never overwritten: if the
/// name is taken the timestamp is bumped and the write retried.
#[derive(Clone)]
pub struct MigrationWriter {
    inner: Arc<MigrationWriterInner>,
}

impl MigrationWriter {
    /// Creates a writer stamping files with the current unix time.
    pub fn new() -> Self {
        MigrationWriter::with_clock(unix_timestamp)
    }

    /// Creates a writer reading seconds since the epoch from `clock`.
    pub fn with_clock(clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        MigrationWriter {
            inner: Arc::new(MigrationWriterInner {
                last_timestamp: Mutex::new(i64::MIN),
                clock: Box::new(clock),
            }),
        }
    }

    /// Writes `script` into `dir`, creating the directory when missing.
    ///
    /// Returns the path of the new file.
    ///
    /// # Errors
    ///
    /// * `ValidationError` when the label has no usable characters or the
    ///   extension is empty.
    /// * `IOError`/`PermissionDenied` when the directory or file cannot be
    ///   written. A partially written file is removed.
    /// * `FileAlreadyExists` when no free name was found.
    pub fn write(&self, dir: &Path, label: &str, extension: &str, script: &str) -> AutomigrateResult<PathBuf> {
        self.inner.write(dir, label, extension, script)
    }
}

impl Default for MigrationWriter {
    fn default() -> Self {
        Self::new()
    }
}

struct MigrationWriterInner {
    last_timestamp: Mutex<i64>,
    clock: Clock,
}

impl MigrationWriterInner {
    fn write(&self, dir: &Path, label: &str, extension: &str, script: &str) -> AutomigrateResult<PathBuf> {
        let label = sanitize_label(label)?;
        let extension = extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err(AutomigrateError::new(
                "Migration file extension must not be empty",
                ErrorKind::ValidationError,
            ));
        }

        fs::create_dir_all(dir).map_err(|e| {
            io_error(&format!("Failed to create migrations directory {}", dir.display()), e)
        })?;

        // serializes writers sharing this instance, so stamps stay unique
        let mut last_timestamp = self.last_timestamp.lock();
        let mut timestamp = (self.clock)().max(last_timestamp.saturating_add(1));

        for _ in 0..MAX_FILENAME_ATTEMPTS {
            let path = dir.join(format!("{}_{}.{}", timestamp, label, extension));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    *last_timestamp = timestamp;
                    write_file(file, &path, script)?;
                    debug!("Wrote migration {}", path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == IoErrorKind::AlreadyExists => {
                    warn!("Migration file {} already exists, retrying", path.display());
                    timestamp += 1;
                }
                Err(e) => {
                    return Err(io_error(
                        &format!("Failed to create migration file {}", path.display()),
                        e,
                    ));
                }
            }
        }

        Err(AutomigrateError::new(
            &format!(
                "No free migration file name for {} after {} attempts",
                label, MAX_FILENAME_ATTEMPTS
            ),
            ErrorKind::FileAlreadyExists,
        ))
    }
}

fn write_file(mut file: File, path: &Path, script: &str) -> AutomigrateResult<()> {
    let result = file
        .write_all(script.as_bytes())
        .and_then(|_| file.sync_all());
    if let Err(e) = result {
        drop(file);
        if let Err(remove_err) = fs::remove_file(path) {
            warn!("Failed to remove partial migration {}: {}", path.display(), remove_err);
        }
        return Err(io_error(
            &format!("Failed to write migration file {}", path.display()),
            e,
        ));
    }
    Ok(())
}

fn io_error(message: &str, err: std::io::Error) -> AutomigrateError {
    let cause = AutomigrateError::from(err);
    AutomigrateError::new_with_cause(message, cause.kind().clone(), cause)
}

/// Replaces every run of characters outside `[A-Za-z0-9_-]` with `_`.
pub(crate) fn sanitize_label(label: &str) -> AutomigrateResult<String> {
    let pattern = Regex::new(UNSAFE_FILENAME_CHARS).map_err(|e| {
        AutomigrateError::new(&format!("Invalid file name pattern: {}", e), ErrorKind::InternalError)
    })?;
    let sanitized = pattern.replace_all(label.trim(), "_");
    if sanitized.trim_matches('_').is_empty() {
        return Err(AutomigrateError::new(
            &format!("Migration label '{}' has no usable characters", label),
            ErrorKind::ValidationError,
        ));
    }
    Ok(sanitized.into_owned())
}
