pub mod clock;
pub mod codec;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod message;
pub mod participant;
pub mod transport;
