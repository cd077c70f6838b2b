//! Core domain types and shared logic for the registry tag garbage collector.
//!
//! This crate defines what the other crates agree on:
//! - Configuration
//! - Registry storage layout (tag pointers, digest index entries)
//! - The frontier used to hand out scan and cleanup work

pub mod config;
pub mod error;
pub mod frontier;
pub mod path;

pub use error::{Error, Result};
pub use frontier::{Frontier, FrontierSnapshot, Lease};
pub use path::{PathClassifier, PathKind, TagPointer};
