use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("failed to load config")]
    LoadConfig,
    #[error("failed to save config")]
    SaveConfig,
    #[error("failed to resolve config location")]
    ConfigLocation,
    #[error("invalid input")]
    InvalidInput,
    #[error("failed to query {0}")]
    Query(String),
    #[error("failed to encode config")]
    Encode,
}
