use thiserror::Error;

/// Why a schema reference did not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefError {
    #[error("invalid schema reference format: {0}")]
    Malformed(String),

    #[error("schema '{0}' not found")]
    NotFound(String),
}

/// First problem found by [`crate::validator::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("API title is required (@title)")]
    MissingTitle,

    #[error("API version is required (@version)")]
    MissingVersion,

    #[error("operation {method} {path} has no responses")]
    NoResponses { path: String, method: String },

    #[error("invalid parameter schema reference in {path}: {source}")]
    InvalidParameterRef {
        path: String,
        #[source]
        source: RefError,
    },

    #[error("invalid request body schema reference ({content_type}) in {path}: {source}")]
    InvalidRequestBodyRef {
        path: String,
        content_type: String,
        #[source]
        source: RefError,
    },

    #[error("invalid response schema reference ({status}, {content_type}) in {path}: {source}")]
    InvalidResponseRef {
        path: String,
        status: String,
        content_type: String,
        #[source]
        source: RefError,
    },
}
