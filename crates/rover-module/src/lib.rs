//! # rover-module
//!
//! Out-of-process module bridge for Rover.
//!
//! Modules are separate processes that provide resource implementations.
//! The reconfiguration engine keeps modular resources first-class graph
//! nodes and delegates only construction, reconfiguration, and removal
//! through the [`ModuleManager`] trait defined here.
//!
//! Also hosted here is the process-environment cleanup applied once at
//! engine startup so spawned module processes inherit a clean environment
//! (see [`clean_app_image_env`]).

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod env;
pub mod manager;

pub use env::clean_app_image_env;
pub use manager::{ModuleError, ModuleManager, ValidationReport};
