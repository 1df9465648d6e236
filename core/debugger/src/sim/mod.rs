//! A simulated engine for driving the bridge without a real script runtime.
//!
//! [`SimHost`] implements the native debugging primitives over an in-memory
//! model of globals, scripts, frames, environments and objects.
//! [`ScriptedWait`] stands in for the client during pauses.

mod host;
mod wait;

pub use host::{OFFSETS_PER_LINE, SimHost};
pub use wait::ScriptedWait;
