//! Error types for the recoverable failure classes.
//!
//! Fatal startup failures (configuration) travel as `anyhow::Error`; the
//! types here are reported where they happen and never abort a run.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure while placing a single link.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Error while creating destination directory: {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error while inspecting destination: {}: {source}", path.display())]
    Inspect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error while removing existing entry: {}: {source}", path.display())]
    RemoveExisting {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Refusing to replace directory with a symlink: {}", path.display())]
    DestinationIsDirectory { path: PathBuf },

    #[error(
        "Error while creating symlink: {} -> {}: {source}",
        source_file.display(),
        destination.display()
    )]
    Symlink {
        source_file: PathBuf,
        destination: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure while discovering files under a source root.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Error while getting stat: {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error while walking: {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Failure of the producer/consumer transport itself.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("link consumer is no longer accepting work")]
    ConsumerGone,

    #[error("link consumer panicked")]
    ConsumerPanicked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symlink_error_names_both_paths() {
        let err = LinkError::Symlink {
            source_file: PathBuf::from("/src/a.txt"),
            destination: PathBuf::from("/out/a.txt"),
            source: io::Error::from(io::ErrorKind::AlreadyExists),
        };

        let msg = err.to_string();
        assert!(msg.contains("/src/a.txt -> /out/a.txt"));
        assert!(msg.starts_with("Error while creating symlink"));
    }

    #[test]
    fn test_create_dir_error_keeps_source() {
        let err = LinkError::CreateDir {
            path: PathBuf::from("/out/sub"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };

        assert!(err.to_string().contains("/out/sub"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
