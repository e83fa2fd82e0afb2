use std::path::PathBuf;

use thiserror::Error;

use crate::scene::NodeId;

/// Errors surfaced by the scene controller and its loaders
#[derive(Debug, Error)]
pub enum SceneError {
    /// A setup step ran before the step it depends on
    #[error("{0} has not been created yet")]
    NotReady(&'static str),

    /// An asset loader failed; the load resolves with this exactly once
    #[error("failed to load {path:?}: {reason}")]
    AssetLoad { path: PathBuf, reason: String },

    #[error("node {0:?} is not in the scene")]
    UnknownNode(NodeId),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("audio error: {0}")]
    Audio(String),
}

impl SceneError {
    pub fn asset(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::AssetLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SceneError>;
