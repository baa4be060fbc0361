//! Order dialogue state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.
//! Customer dialogue and the admin handoff protocol both live here; the
//! runtime executes the effects they produce.

pub mod effect;
pub mod event;
pub mod handoff;
pub mod prompts;
pub mod state;
pub(crate) mod transition;


pub use effect::{Effect, OutboundMessage};
pub use event::{Event, Inbound};
pub use state::{Actor, DialogueContext, PriceCapture, Session};
pub use transition::transition;
