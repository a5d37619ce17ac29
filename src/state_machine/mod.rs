// State machine module for call lifecycle management
//
// One `CallStateMachine` per RPC. The table of legal transitions lives in
// `call_state_machine.rs`; the driver in `client::driver` feeds it events as
// the transport makes progress.

pub mod call_state_machine;
pub mod errors;
pub mod events;
pub mod states;

// Re-export main types for convenient access
pub use call_state_machine::{CallStateMachine, TransitionRecord};
pub use errors::{StateMachineError, StateMachineResult};
pub use events::TransitionEvent;
pub use states::CallState;
