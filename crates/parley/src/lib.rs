//! A personal assistant assembled from the `parley` building blocks.
//!
//! The crate ships a REPL for the terminal, and can also be used as a
//! library to put the same assistant behind another chat platform.

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

mod profile;
mod session;
pub mod tools;

pub use profile::FileProfileStore;
pub use session::{DEFAULT_WINDOW_SIZE, Session, SessionAgent, SessionBuilder};

/// Re-exports of [`parley_core`] crate.
pub mod core {
    pub use parley_core::*;
}
