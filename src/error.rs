//! Error kinds for the core, per the five classes in the design: configuration,
//! per-read input, transient resource, invariant violation, and I/O.

use std::path::PathBuf;
use thiserror::Error;

/// Process exit codes matching the CLI contract.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const USAGE: i32 = 1;
    pub const INPUT_FORMAT: i32 = 2;
    pub const ARCHIVE_LOAD: i32 = 3;
    pub const IO: i32 = 4;
    pub const INTERNAL: i32 = 5;
}

#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad CLI arguments or an archive that fails its version/model check. Fatal,
    /// aborts before any worker starts.
    #[error("configuration error: {0}")]
    Config(String),

    /// A single read record could not be parsed or validated. Recoverable at the
    /// read boundary: the worker skips the record and keeps going.
    #[error("input record error (record {record}): {reason}")]
    InputRecord { record: String, reason: String },

    /// A resource the worker needs (arena slab, GPU buffer slot) was momentarily
    /// exhausted. The caller should retry after a bounded drain.
    #[error("transient resource error: {0}")]
    Transient(String),

    /// An internal invariant was violated (e.g. a traceback overshoot). Fatal in
    /// debug builds; downgraded to a discarded match with a log warning in release.
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// I/O failure reading the archive, input streams, or writing output.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive failed its header/model check.
    #[error("archive load error: {0}")]
    ArchiveLoad(String),
}

impl CoreError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CoreError::Config(_) => exit_code::USAGE,
            CoreError::InputRecord { .. } => exit_code::INPUT_FORMAT,
            CoreError::ArchiveLoad(_) => exit_code::ARCHIVE_LOAD,
            CoreError::Io { .. } => exit_code::IO,
            CoreError::Transient(_) | CoreError::Invariant(_) => exit_code::INTERNAL,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Raise an invariant violation: panics in debug builds, logs and returns `Err`
/// in release builds so the caller can downgrade to a discarded match.
#[macro_export]
macro_rules! invariant_violation {
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        if cfg!(debug_assertions) {
            panic!("invariant violation: {}", msg);
        } else {
            log::warn!("invariant violation (match discarded): {}", msg);
            return Err($crate::error::CoreError::Invariant(msg));
        }
    }};
}
