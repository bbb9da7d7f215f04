//! Rill Time - Timer collaborators for `Observable::timeout`
//!
//! This crate provides two `Scheduler` hosts:
//! - `VirtualScheduler`: deterministic virtual clock, advanced by hand
//! - `TokioScheduler`: real timers on a tokio `LocalSet`

pub mod clock;
pub mod local;

pub use clock::*;
pub use local::*;
