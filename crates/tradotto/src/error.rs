//! Translation engine error types.

use thiserror::Error;

/// Errors raised by the translation engine.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// The registered type declares no translatable attributes. This is a
    /// static configuration mistake; it is raised before any transaction
    /// opens and is never retried.
    #[error("type '{type_name}' declares no translatable attributes")]
    MissingTranslatables { type_name: String },

    /// A declared translatable attribute was supplied with something other
    /// than a locale-to-scalar mapping. Raised during extraction; rolls back
    /// the enclosing transaction.
    #[error("translatable attribute '{attribute}' must map locale codes to scalar values")]
    InvalidFormat { attribute: String },

    /// A translation payload was keyed by a malformed locale code.
    #[error("invalid locale code '{locale}'")]
    InvalidLocale { locale: String },

    /// Storage-layer failure, passed through unchanged.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Statement construction or row decoding failure.
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

/// Result type alias using TranslationError.
pub type TranslationResult<T> = Result<T, TranslationError>;
