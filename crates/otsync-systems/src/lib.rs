//! # OTSync Systems
//!
//! Reference diff types for OTSync.
//!
//! This crate provides:
//! - Plain-text insert/delete edits with char-based positions
//! - Key/value edits with greater-value-wins resolution
//! - Document states both kinds of edit apply to
//!
//! Both systems plug into [`otsync_core::OtSystem`] and can be combined with
//! [`otsync_core::MergedSystem`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod map;
pub mod text;

pub use map::{MapEdit, MapOtSystem, MapState};
pub use text::{TextDocument, TextEdit, TextOtSystem};
