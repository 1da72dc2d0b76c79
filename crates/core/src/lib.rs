//! Scheduling model and rules for tabletop role-playing sessions.
//!
//! Everything in this crate is pure: no I/O, no clock reads except where a
//! caller hands in `now`. The store and service crates build on top of it.

pub mod archive;
pub mod conflict;
pub mod lifecycle;
pub mod model;
pub mod trigger_warnings;
pub mod validate;

pub use model::*;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
