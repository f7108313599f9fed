//! # rover-error
//!
//! Shared failure kinds for the Rover workspace.
//!
//! Rover's crates each carry a domain error — `ResourceError` for graph and
//! build failures, `ModuleError` at the module bridge, `DialError` for
//! remote dials. A handful of failure kinds cut across all of them: a name
//! that resolves to nothing, a name already taken, a deadline that lapsed,
//! plain I/O trouble. [`CommonError`] is that handful, defined once so each
//! domain error can absorb it through a single transparent variant:
//!
//! ```rust,ignore
//! use rover_error::CommonError;
//! use thiserror::Error;
//!
//! #[derive(Debug, Error)]
//! enum SnapshotError {
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//!
//!     #[error("snapshot ring is empty")]
//!     Empty,
//! }
//! ```
//!
//! Code that can only fail in these shared ways returns [`CommonError`]
//! directly (via the [`Result`] alias) rather than inventing a wrapper.

mod common;

pub use common::CommonError;

/// Alias for fallible operations that only produce shared failures.
pub type Result<T> = std::result::Result<T, CommonError>;
