//! The failure kinds that recur across the Rover workspace.

use thiserror::Error;

/// Cross-cutting failures shared by the Rover crates.
///
/// The graph, config, module, and federation crates each define a domain
/// error for the failures only they can produce. The kinds below recur in
/// all of them — a name that resolves to nothing, a name already taken, a
/// lifecycle state that cannot serve the request, a deadline that lapsed.
/// Defining them once keeps lookup, registration, and deadline handling
/// uniform; a domain error absorbs them through a single `#[from]` variant.
#[derive(Debug, Error)]
pub enum CommonError {
    /// An operating-system level failure: environment manipulation, module
    /// process plumbing, connection teardown.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// Something was asked for by name — a resource, a remote, a module, a
    /// graph snapshot — and nothing is registered under that name.
    #[error("missing: {0}")]
    NotFound(String),

    /// A registration collided with a name the graph already holds.
    #[error("name already in use: {0}")]
    Duplicate(String),

    /// The named entity exists but its lifecycle state cannot serve the
    /// request, e.g. an uninitialized node asked for its object.
    #[error("not in a usable state: {0}")]
    InvalidState(String),

    /// A bounded operation ran past its deadline and was abandoned.
    #[error("deadline exceeded: {0}")]
    Timeout(String),

    /// A failure callers cannot act on beyond logging it.
    #[error("internal: {0}")]
    Internal(String),
}

impl CommonError {
    /// A missing entity, by name.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// A name collision.
    #[must_use]
    pub fn duplicate(what: impl Into<String>) -> Self {
        Self::Duplicate(what.into())
    }

    /// A lifecycle state that cannot serve the request.
    #[must_use]
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// A lapsed deadline.
    #[must_use]
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// An unactionable failure.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True when the failure is a missing entity.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// True when the failure is a lapsed deadline.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
