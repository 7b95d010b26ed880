//! Core types: upstream envelopes and outbound protocol events.

pub mod envelope;
pub mod events;
pub mod role;
pub mod usage;

pub use envelope::*;
pub use events::*;
pub use role::*;
pub use usage::*;
