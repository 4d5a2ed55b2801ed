use thiserror::Error;

/// Failure taxonomy shared by every stage of the pipeline.
///
/// `DataLoad` and `EmbeddingBuild` are startup failures and are surfaced to the
/// host. `Retrieval` and `Generation` happen per query and are absorbed by the
/// chat layer into a degraded response.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load dataset: {0}")]
    DataLoad(String),

    #[error("Failed to build embedding index: {0}")]
    EmbeddingBuild(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Generation failed: {0}")]
    Generation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
