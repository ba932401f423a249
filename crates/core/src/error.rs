use thiserror::Error;

/// Engine-level failures. Expected conditions (stale ref, no structural
/// match, empty page) are signaled through `Option`/marker values, never
/// through this enum.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No usable root node: {0}")]
    NoRoot(String),
}

pub type Result<T> = std::result::Result<T, Error>;
