use std::path::PathBuf;

use mash::{Address, ParseError};

use crate::fragment::EvaluationError;

#[derive(Debug, thiserror::Error)]
pub enum WeaveError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{address}: cannot find '{target}' to include (searched {})", display_paths(.searched))]
    IncludeNotFound {
        target: String,
        address: Address,
        searched: Vec<PathBuf>,
    },

    #[error("{address}: including '{target}' would include {} inside itself", .path.display())]
    IncludeCycle {
        target: String,
        address: Address,
        path: PathBuf,
    },

    #[error("{address}: cannot read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        address: Address,
        source: std::io::Error,
    },

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error("no event is ready but {pending} are still pending")]
    Stalled { pending: usize },

    #[error("gave up after {limit} restarts")]
    TooManyRestarts { limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WeaveError {
    /// The document position this error is attributed to, if it has one.
    pub fn address(&self) -> Option<&Address> {
        match self {
            WeaveError::Parse(err) => Some(err.address()),
            WeaveError::IncludeNotFound { address, .. }
            | WeaveError::IncludeCycle { address, .. }
            | WeaveError::Read { address, .. } => Some(address),
            WeaveError::Evaluation(err) => Some(&err.address),
            WeaveError::Stalled { .. } | WeaveError::TooManyRestarts { .. } | WeaveError::Io(_) => {
                None
            }
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nowhere".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
