//! # World Error Types
//!
//! All errors that can occur while running, saving or loading a world.

use std::path::PathBuf;

use kaleido_shared::ProtocolError;
use thiserror::Error;

/// Errors that can occur in the world system.
#[derive(Error, Debug)]
pub enum WorldError {
    /// Low-level stream failure (truncation, bad length, future version).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A behavior tag that no behavior kind claims.
    #[error("unknown behavior tag {0}")]
    UnknownBehavior(i32),

    /// A factory id with no configured factory.
    #[error("unknown shape factory {0}")]
    UnknownFactory(i32),

    /// A shape id outside the factory's catalog.
    #[error("factory {factory} has no shape {shape}")]
    UnknownShape {
        /// Factory that was asked.
        factory: i32,
        /// Requested shape id.
        shape: i32,
    },

    /// A material id outside the factory's catalog.
    #[error("factory {factory} has no material {material}")]
    UnknownMaterial {
        /// Factory that was asked.
        factory: i32,
        /// Requested material id.
        material: i32,
    },

    /// A level id the level loader does not know.
    #[error("unknown level {0}")]
    UnknownLevel(i64),

    /// A level transition or load is already running.
    #[error("a level transition or load is already in flight")]
    LoadInProgress,

    /// The storage backend holds no save.
    #[error("no save found")]
    NoSaveFound,

    /// The storage backend failed.
    #[error("storage error at {path}: {source}")]
    Storage {
        /// File that was accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl WorldError {
    /// True for a stream written by a newer format. Recoverable; the world was not touched.
    #[must_use]
    pub const fn is_format(&self) -> bool {
        matches!(
            self,
            Self::Protocol(ProtocolError::UnsupportedVersion { .. })
        )
    }

    /// True for structural stream damage. Retrying cannot help.
    #[must_use]
    pub const fn is_corrupt(&self) -> bool {
        match self {
            Self::Protocol(err) => !matches!(err, ProtocolError::UnsupportedVersion { .. }),
            Self::UnknownBehavior(_)
            | Self::UnknownFactory(_)
            | Self::UnknownShape { .. }
            | Self::UnknownMaterial { .. } => true,
            _ => false,
        }
    }
}

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;
