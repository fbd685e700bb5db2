use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("Scene index {index} is out of range for a sequence of {len} scenes")]
    InvalidSceneIndex { index: usize, len: usize },
}
