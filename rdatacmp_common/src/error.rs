use thiserror::Error;

#[derive(Error, Debug)]
pub enum RDataCmpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data source error: {0}")]
    Source(#[from] SourceError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Plugin not found: {group}/{name}")]
    PluginNotFound { group: String, name: String },

    #[error("Plugin error: {0}")]
    Plugin(String),

    #[error("Comparison cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, RDataCmpError>;

/// Failures raised by data source adapters while fetching rows
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source not found: {0}")]
    NotFound(String),

    #[error("Malformed data in {source_id}: {message}")]
    Malformed { source_id: String, message: String },

    #[error("Invalid source options: {0}")]
    Options(String),
}
