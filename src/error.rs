//! Rich diagnostic error types for rafiq.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]`
//! derives, providing error codes, help text, and source chains. Errors that
//! originate inside the routing pipeline never escape it (they are converted
//! to normal turn outcomes at the point of origin), so these types surface
//! only from CLI maintenance commands and startup.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for rafiq.
///
/// Each variant wraps a subsystem-specific error, preserving the full
/// diagnostic chain (error codes, help text, sources) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum RafiqError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Kb(#[from] KbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] crate::paths::PathError),
}

/// Convenience alias for functions returning rafiq results.
pub type RafiqResult<T> = std::result::Result<T, RafiqError>;

// ---------------------------------------------------------------------------
// Knowledge base errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum KbError {
    #[error("required card field is empty: {field}")]
    #[diagnostic(
        code(rafiq::kb::validation),
        help("type, title, source_name, and reference must all be non-empty strings.")
    )]
    Validation { field: &'static str },

    #[error("I/O error: {source}")]
    #[diagnostic(
        code(rafiq::kb::io),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(rafiq::kb::redb),
        help(
            "The embedded database encountered a transaction error. \
             This may indicate corruption — try `rafiq init` with a fresh data directory."
        )
    )]
    Redb { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(rafiq::kb::serde),
        help(
            "Failed to serialize or deserialize a card record. \
             This usually means the stored format has changed between versions."
        )
    )]
    Serialization { message: String },

    #[error("failed to parse the bundled seed catalogue: {message}")]
    #[diagnostic(
        code(rafiq::kb::seed),
        help("Check the `[[cards]]` entries in data/seeds/cards.toml.")
    )]
    Seed { message: String },
}

/// Result type for knowledge base operations.
pub type KbResult<T> = std::result::Result<T, KbError>;
