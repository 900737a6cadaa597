//! The payment flow as an explicit state machine.
//!
//! [`machine::FlowMachine`] is pure: it consumes [`events::FlowEvent`]s and
//! returns [`events::Command`]s. [`driver::FlowDriver`] owns the machine,
//! executes commands in spawned tasks and feeds their completions back as
//! events. Observers read [`state::FlowState`] through a watch channel.

pub mod channels;
pub mod driver;
pub mod events;
pub mod machine;
pub mod state;

pub use driver::{FlowClosed, FlowDriver, FlowHandle};
pub use events::{Command, FlowEvent};
pub use machine::FlowMachine;
pub use state::FlowState;
