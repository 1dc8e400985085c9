//! Test utilities for audio testing
//!
//! Signal generators, in-memory WAV encoding and simple analysis helpers
//! shared by this crate's tests and by downstream crates through the
//! `test-utils` feature.

mod signals;

pub use signals::*;
