#![forbid(unsafe_code)]

//! Reactive primitives shared by layer state and tools.
//!
//! - [`Observable`]: a shared value cell that notifies on change.
//! - [`Signal`]: a broadcast channel with no stored value.
//! - [`Subscription`]: RAII guard returned by both; dropping it unsubscribes.

pub mod observable;
pub mod signal;

pub use observable::{Observable, Subscription};
pub use signal::Signal;
