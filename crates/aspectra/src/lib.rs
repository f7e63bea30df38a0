//! # Aspectra
//!
//! Aspect extraction for Russian scientific abstracts. This crate re-exports
//! [`aspectra_core`]; see its documentation for the full API.

pub use aspectra_core::*;
