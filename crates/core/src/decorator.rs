//! Wrappers that add behavior around a [`ChatAgent`](crate::ChatAgent).
//!
//! Every decorator owns one inner agent and is itself a `ChatAgent`, so a
//! chain is built by nesting them at startup:
//!
//! ```ignore
//! let agent = Logging::new(
//!     ProfileInjection::new(SlidingWindow::new(agent, size), store).await?,
//! );
//! ```
//!
//! The outermost decorator is the one callers talk to.

mod logging;
mod profile;
mod sliding_window;

pub use logging::{LOG_TARGET, Logging};
pub use profile::{
    DEFAULT_MAX_PROFILE_ROUNDS, GET_PROFILE_TOOL, PROFILE_MESSAGE_NAME,
    ProfileInjection, SET_PROFILE_TOOL,
};
pub use sliding_window::SlidingWindow;
