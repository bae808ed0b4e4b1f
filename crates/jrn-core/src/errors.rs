/// Core error type for the watcher.
///
/// Adapter crates map their specific failures into this type so the watcher
/// can treat them uniformly: every variant degrades to "skip this cycle,
/// retry on the next one" rather than killing the process.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
