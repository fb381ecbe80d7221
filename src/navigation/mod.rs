pub mod channel;
pub mod coordinator;
pub mod delivery;
pub mod messages;
pub mod session_state;
