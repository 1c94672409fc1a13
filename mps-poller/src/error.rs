use mps_can::CanError;

#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    #[error("{0}")]
    Can(#[from] CanError),
    #[error("MPS - config error: {0}")]
    Config(String),
    #[error("MPS - output error: {0}")]
    Io(#[from] std::io::Error),
    #[error("MPS - catalog error: {0}")]
    Catalog(#[from] serde_yaml::Error),
    #[error("MPS - invalid hex payload: {0}")]
    Hex(#[from] hex::FromHexError),
}
