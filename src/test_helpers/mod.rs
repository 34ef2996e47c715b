//! Shared test doubles and fixtures.

mod channel;
mod events;
pub mod fixtures;
mod programmer;
mod temp;

pub use channel::ScriptedChannel;
pub use events::EventLog;
pub use programmer::SimulatedProgrammer;
pub use temp::TestContext;
