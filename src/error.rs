use thiserror::Error;

/// Errors raised while normalizing or serializing payloads.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unknown entity type: {0}")]
    UnknownType(String),

    #[error("Missing identifier field `{field}` on {type_name} record")]
    MissingIdentifier { type_name: String, field: String },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Expected a JSON object for {type_name} payload")]
    NotAnObject { type_name: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
