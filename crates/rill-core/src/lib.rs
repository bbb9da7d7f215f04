//! Rill Core - Lazy push-based observables
//!
//! This crate defines the observable core and its combinators:
//! - Observer and Subscription contracts
//! - Observable (cold, re-executable producer wrapper)
//! - Operators (map, filter) and their fallible variants
//! - Combinators (concat, retry, timeout, from_event)
//! - Host collaborators (Scheduler, EventSource)

pub mod id;
pub mod error;
pub mod observer;
pub mod subscription;
pub mod observable;
pub mod operators;
pub mod combinators;
pub mod timer;
pub mod event;

pub use id::*;
pub use error::*;
pub use observer::*;
pub use subscription::*;
pub use observable::*;
pub use timer::*;
pub use event::*;
