use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    clock::ClockSource,
    message::{Reply, Request},
};

pub struct Handler {
    name: String,
    address: String,
    clock: Arc<dyn ClockSource>,
}

pub enum Outcome {
    Continue,
    Stop,
}

impl Handler {
    pub fn new(name: impl Into<String>, address: impl Into<String>, clock: Arc<dyn ClockSource>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            clock,
        }
    }

    pub fn handle(&self, request: Request) -> (Reply, Outcome) {
        match request {
            Request::GetTime {
                t0_ms,
                leader_address,
                ..
            } => {
                let local_now = self.clock.now_ms();
                let tp = (t0_ms + local_now) / 2;
                debug!(
                    leader = %leader_address,
                    t0_ms, local_now, tp, "GET_TIME"
                );
                (
                    Reply::Poll {
                        follower_name: self.name.clone(),
                        local_time_ms: tp,
                        address_follower: self.address.clone(),
                    },
                    Outcome::Continue,
                )
            }
            Request::UpdateTime { delta_ms, .. } => {
                let local_now = self.clock.now_ms();
                let new_local = local_now + delta_ms;
                self.clock.apply_offset(delta_ms);
                info!(delta_ms, new_local, "UPDATE_TIME applied");
                (
                    Reply::Updated {
                        follower_name: self.name.clone(),
                        local_time_ms: new_local,
                    },
                    Outcome::Continue,
                )
            }
            Request::Close { .. } => {
                info!("CLOSE received, will stop serving after this reply");
                (
                    Reply::Closed {
                        follower_name: self.name.clone(),
                    },
                    Outcome::Stop,
                )
            }
        }
    }

    pub fn handle_decode_failure(&self, reason: impl std::fmt::Display) -> Reply {
        warn!(%reason, "rejecting request that failed to decode");
        Reply::Error {
            error: reason.to_string(),
        }
    }
}
