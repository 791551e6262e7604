pub mod result;
pub mod round;

pub use result::{ParticipantRecord, PeerState, RoundResult};
pub use round::{CancelSignal, Coordinator};
