//! # rover-remote
//!
//! Remote machine federation interfaces for Rover.
//!
//! A remote machine appears in the local resource graph as a node whose
//! children are the resources the peer advertises, prefixed with the
//! remote's name. This crate defines the seams the engine federates through:
//!
//! - [`RemoteRobot`]: the capability set of a connected peer (enumerate
//!   resources, hand out client stubs, report status, notify of changes)
//! - [`Dialer`]: turns a remote config into a connected [`RemoteRobot`]
//! - [`DialOptions`]: dial parameters assembled from config and runtime
//!   policy
//!
//! Concrete wire transports (gRPC, WebRTC, mDNS) implement these traits
//! elsewhere; the engine never sees past them.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod dial;

pub use client::{
    CloudMetadata, MachineStatus, ParentNotifier, RemoteResource, RemoteRobot, ResourceStatus,
};
pub use dial::{DialError, DialOptions, Dialer};
