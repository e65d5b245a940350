//! # OTSync Core
//!
//! Operational transformation primitives for multi-writer document state.
//!
//! This crate provides:
//! - Compact, totally ordered commit identifiers with a canonical byte form
//! - The [`OtSystem`] capability a diff type implements to be transformable
//! - Sequence transformation with all-or-nothing conflict reporting
//! - Squash and invert helpers for diff sequence algebra
//! - A [`MergedSystem`] combinator for documents made of independent parts
//!
//! The crate knows nothing about what a diff means. Concrete diff types
//! supply their own rules through [`OtSystem`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algebra;
pub mod commit_id;
pub mod config;
pub mod merged;
pub mod result;
pub mod state;
pub mod system;
pub mod transform;

pub use commit_id::{CommitId, ParseError};
pub use config::{ConfigError, TransformConfig};
pub use merged::{MergedDiff, MergedSystem};
pub use result::{Conflict, PairTransform, TransformResult};
pub use state::{OtState, StateError};
pub use system::OtSystem;
pub use transform::{InvalidDiff, Side, TransformBudget, TransformError};
