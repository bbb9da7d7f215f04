//! Rill Test Harness - Observers and sources for protocol validation
//!
//! This crate provides:
//! - Recording observers that capture every notification
//! - Scripted probe sources that count activations and teardowns
//! - End-to-end tests of operator and combinator semantics

pub mod recorder;
pub mod probe;

#[cfg(test)]
mod integration;

pub use recorder::*;
pub use probe::*;
