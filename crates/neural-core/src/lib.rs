//! Neural Core — shared error types for the neural query crates.
//!
//! This crate has no internal dependencies (dependency level 0). Every other
//! crate in the workspace reports failures through [`Error`] and [`Result`].

pub mod error;

pub use error::{BoxError, Error, Result};
