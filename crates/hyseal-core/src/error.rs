use thiserror::Error;

pub type HysealResult<T> = Result<T, HysealError>;

#[derive(Debug, Error)]
pub enum HysealError {
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
