//! Error types shared by the gateway, the store and the form-level checks.

use crate::gateway::Collection;
use thiserror::Error;

/// Failures talking to the document backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("backend request failed: {0}")]
    Backend(#[from] anyhow::Error),

    #[error("could not convert {collection} document: {source}")]
    Codec {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },

    #[error("backend returned a document without a name")]
    MissingName,

    #[error("{collection} document '{id}' does not exist")]
    NotFound { collection: Collection, id: String },

    #[error("{0} collection is unavailable")]
    Unavailable(Collection),
}

/// Input rejected before any backend call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("rating must be between 0 and 100, got {0}")]
    RatingOutOfRange(u8),

    #[error("notes must be at most {max} characters, got {len}")]
    NotesTooLong { len: usize, max: usize },

    #[error("{field} must be at least 1")]
    MissingSeriesField { field: &'static str },

    #[error("duration must be between 1 and 999 minutes")]
    InvalidDuration,

    #[error("invalid trailer URL '{0}'")]
    InvalidTrailerUrl(String),

    #[error("tag name must not be empty")]
    EmptyTagName,

    #[error("a tag named '{0}' already exists")]
    DuplicateTag(String),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("no item with id '{0}'")]
    UnknownItem(String),

    #[error("no tag with id '{0}'")]
    UnknownTag(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
