//! # rover-runtime
//!
//! The resource manager at the heart of the Rover runtime.
//!
//! [`ResourceManager`] takes a declarative configuration of hardware
//! components, software services, remote machines, and out-of-process
//! modules, and materialises it as a live, dependency-ordered graph of
//! running objects. It keeps that graph continuously in sync with a mutable
//! configuration stream while isolating failures of any individual node
//! from the rest of the system.
//!
//! ## Reconfiguration flow
//!
//! ```text
//! new config diff
//!       │
//!       ▼
//! update_resources ── mark added/modified nodes pending,
//!       │              removed nodes for removal
//!       ▼
//! complete_config ──► dial remotes (parallel, capped)
//!       │             resolve dependencies
//!       │             topological levels
//!       │             per level: build/reconfigure nodes
//!       │               (parallel within a level, per-node timeout)
//!       ▼
//! remove_marked_and_close ── close everything still marked
//! ```
//!
//! Individual resource failures are recorded on their nodes and never abort
//! a pass; only cancellation of the outer context does.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod federation;
pub mod host;
pub mod manager;
mod reconfigure;

pub use host::RuntimeHost;
pub use manager::{
    web_service_name, ResourceManager, ResourceManagerOptions,
    DEFAULT_RESOURCE_CONFIGURATION_TIMEOUT, REMOTE_MACHINE_STATUS_TIMEOUT,
    RESOURCE_CONFIGURATION_TIMEOUT_ENV,
};

/// Result type alias for manager operations, using the shared resource
/// error. Every failure kind here (cycle, clash, build failures, timeouts)
/// is resource-level and surfaced through nodes, so the manager does not
/// define an error enum of its own.
pub type Result<T> = std::result::Result<T, rover_resource::ResourceError>;
