//! Error types for the search-session crate

use thiserror::Error;

/// Result type alias for search-session operations
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur while managing search state
#[derive(Debug, Error)]
pub enum SearchError {
    /// Raw input that classifies as none of value/range/box
    #[error("unknown constraint value: {detail}")]
    UnknownValueKind { detail: String },

    /// URL token that matches no shape in the token grammar
    #[error("unable to parse constraint value token: {token}")]
    UnparsableToken { token: String },

    /// Second removal of the same value handle from its container
    #[error("value already removed from its container")]
    AlreadyRemoved,

    /// A value variant the constraint kind cannot accept
    #[error("invalid value for {kind} constraint: {name}")]
    InvalidConstraintValue { kind: String, name: String },

    /// Discriminating key outside the recognized constraint vocabulary
    #[error("unknown constraint kind: {key}")]
    UnknownConstraintKind { key: String },

    /// Definition object with no discriminating key
    #[error("not a constraint definition")]
    NotAConstraint,

    /// Constraint URL entry that does not split into exactly (name, token)
    #[error("bad constraint parameter: {param}")]
    BadConstraintParam { param: String },

    /// URL update referencing a constraint the session does not own
    #[error("missing constraint: {name}")]
    MissingConstraint { name: String },

    /// Reserved extension point
    #[error("not implemented: {what}")]
    NotImplemented { what: &'static str },

    /// Cached constraint-discovery failure, replayed on every readiness wait
    #[error("failed to initialize: {detail}")]
    Lifecycle { detail: String },

    /// Non-ok backend response; the caller owns any retry
    #[error("backend {operation} request failed")]
    Backend { operation: &'static str },

    /// Backend JSON that does not deserialize into the declared shape
    #[error("invalid backend response: {detail}")]
    InvalidResponse { detail: String },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SearchError {
    /// Returns the error type string (for logs and JSON surfaces)
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::UnknownValueKind { .. } => "UNKNOWN_VALUE_KIND",
            Self::UnparsableToken { .. } => "UNPARSABLE_TOKEN",
            Self::AlreadyRemoved => "ALREADY_REMOVED",
            Self::InvalidConstraintValue { .. } => "INVALID_CONSTRAINT_VALUE",
            Self::UnknownConstraintKind { .. } => "UNKNOWN_CONSTRAINT_KIND",
            Self::NotAConstraint => "NOT_A_CONSTRAINT",
            Self::BadConstraintParam { .. } => "BAD_CONSTRAINT_PARAM",
            Self::MissingConstraint { .. } => "MISSING_CONSTRAINT",
            Self::NotImplemented { .. } => "NOT_IMPLEMENTED",
            Self::Lifecycle { .. } => "LIFECYCLE_FAILURE",
            Self::Backend { .. } => "BACKEND_FAILURE",
            Self::InvalidResponse { .. } => "INVALID_RESPONSE",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Returns whether the error is a synchronous input error (malformed
    /// definition, value, token, or parameter), as opposed to a lifecycle
    /// or backend failure.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownValueKind { .. }
                | Self::UnparsableToken { .. }
                | Self::AlreadyRemoved
                | Self::InvalidConstraintValue { .. }
                | Self::UnknownConstraintKind { .. }
                | Self::NotAConstraint
                | Self::BadConstraintParam { .. }
                | Self::MissingConstraint { .. }
        )
    }
}
