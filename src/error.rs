use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Detector Error: {0}")]
    DetectorError(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Motion Filter Error: {0}")]
    MotionFilterError(String),

    #[error("Config Error: {0}")]
    ConfigError(String),

    #[error("Config Parse Error: {0}")]
    ConfigParseError(#[from] serde_json::Error),

    #[error("Io Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Frame {got} is out of order, previous frame was {last}")]
    OutOfOrderFrameError { last: u64, got: u64 },
}

impl Error {
    pub fn detector<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::DetectorError(err.into())
    }
}
