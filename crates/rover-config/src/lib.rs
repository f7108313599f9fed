//! # rover-config
//!
//! Machine configuration model for Rover.
//!
//! The runtime consumes already-parsed configuration: a [`Config`] names the
//! components, services, remote machines, and out-of-process modules a
//! machine should run, and a [`ConfigDiff`] carries the added/modified/
//! removed sets between two configuration generations plus the revision tag
//! of the new generation.
//!
//! Where the configuration comes from (filesystem, cloud) is not this
//! crate's concern; neither is computing diffs.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod diff;
pub mod module;
pub mod remote;

pub use diff::{Config, ConfigDiff};
pub use module::{ModuleConfig, ModuleType};
pub use remote::{Credentials, RemoteAuth, RemoteConfig, TlsOptions, WebRtcOptions};
