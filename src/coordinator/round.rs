use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::result::{ParticipantRecord, PeerState, RoundResult};
use crate::{
    clock::ClockSource,
    codec,
    config::PeerInfo,
    error::TransportError,
    message::{Reply, Request},
    transport::Transport,
};

// in-flight send_request calls are never aborted; cancellation is only
// observed at the barrier between phases
#[derive(Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Coordinator {
    name: String,
    address: String,
    clock: Arc<dyn ClockSource>,
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl Coordinator {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        clock: Arc<dyn ClockSource>,
        transport: Arc<dyn Transport>,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            clock,
            transport,
            timeout,
        }
    }

    pub async fn run_round(&self, followers: &[PeerInfo]) -> RoundResult {
        self.run_round_with_cancel(followers, &CancelSignal::default())
            .await
    }

    pub async fn run_round_with_cancel(
        &self,
        followers: &[PeerInfo],
        cancel: &CancelSignal,
    ) -> RoundResult {
        info!(coordinator = %self.name, followers = followers.len(), "starting round");

        let mut records: HashMap<String, ParticipantRecord> = followers
            .iter()
            .map(|peer| (peer.name.clone(), ParticipantRecord::new(&peer.name, &peer.address)))
            .collect();

        self.phase_poll(&mut records, followers).await;

        if cancel.is_cancelled() {
            warn!("round cancelled after poll phase");
            return Self::finish(records);
        }

        if let Some(delta) = self.phase_compute_offset(&records) {
            info!(delta, "computed adjustment offset");
            self.phase_adjust(&mut records, delta).await;

            if cancel.is_cancelled() {
                warn!("round cancelled after adjust phase");
                return Self::finish(records);
            }

            self.phase_close(&mut records).await;
        } else {
            info!("offset is zero or no participant responded; skipping adjust and close");
        }

        Self::finish(records)
    }

    fn finish(records: HashMap<String, ParticipantRecord>) -> RoundResult {
        let mut result = RoundResult::default();
        for record in records.into_values() {
            result.record(record);
        }
        result
    }

    async fn phase_poll(
        &self,
        records: &mut HashMap<String, ParticipantRecord>,
        followers: &[PeerInfo],
    ) {
        let t0 = self.clock.now_ms();
        let mut tasks = JoinSet::new();
        for peer in followers {
            let transport = self.transport.clone();
            let clock = self.clock.clone();
            let timeout = self.timeout;
            let leader_address = self.address.clone();
            let peer = peer.clone();
            tasks.spawn(async move {
                let request = codec::encode_request(&Request::GetTime {
                    message: "Requesting time sync".into(),
                    t0_ms: t0,
                    leader_address,
                });
                let outcome = transport
                    .send_request(&peer.address, &request, timeout)
                    .await;
                let (state, tr, tp) = match outcome {
                    Ok(bytes) => {
                        let tr = clock.now_ms();
                        match codec::decode_reply(&bytes) {
                            Ok(Reply::Poll { local_time_ms, .. }) => {
                                (PeerState::Responded, tr, local_time_ms)
                            }
                            _ => (PeerState::ConnectionError, 0, 0),
                        }
                    }
                    Err(TransportError::Timeout { .. }) => (PeerState::NoResponse, 0, 0),
                    Err(_) => (PeerState::ConnectionError, 0, 0),
                };
                (peer.name, state, tr, tp)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (name, state, tr, tp) = joined.expect("poll task panicked");
            debug!(%name, ?state, "poll settled");
            if let Some(record) = records.get_mut(&name) {
                record.state = state;
                if state == PeerState::Responded {
                    record.t0_ms = t0;
                    record.tr_ms = tr;
                    record.tp_ms = tp;
                }
            }
        }
    }

    // None means skip phases 3 and 4: nobody responded, or avg_diff is
    // already zero
    fn phase_compute_offset(&self, records: &HashMap<String, ParticipantRecord>) -> Option<i64> {
        let mut responded: Vec<&ParticipantRecord> = records
            .values()
            .filter(|record| record.state == PeerState::Responded)
            .collect();
        responded.sort_by(|a, b| a.name.cmp(&b.name));
        if responded.is_empty() {
            return None;
        }
        let sum: i64 = responded.iter().map(|record| record.diff_ms()).sum();
        let avg_diff = sum / responded.len() as i64;
        if avg_diff == 0 {
            None
        } else {
            Some(avg_diff)
        }
    }

    async fn phase_adjust(&self, records: &mut HashMap<String, ParticipantRecord>, delta: i64) {
        let targets: Vec<ParticipantRecord> = records
            .values()
            .filter(|record| record.state == PeerState::Responded)
            .cloned()
            .collect();

        let mut tasks = JoinSet::new();
        for record in targets {
            let transport = self.transport.clone();
            let timeout = self.timeout;
            let leader_address = self.address.clone();
            tasks.spawn(async move {
                let request = codec::encode_request(&Request::UpdateTime {
                    message: "Modifica el tiempo del sistema con el diferencial".into(),
                    delta_ms: delta,
                    leader_address,
                });
                let outcome = transport
                    .send_request(&record.address, &request, timeout)
                    .await;
                let ok = matches!(
                    outcome.map(|bytes| codec::decode_reply(&bytes)),
                    Ok(Ok(Reply::Updated { .. }))
                );
                (record.name, ok)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (name, ok) = joined.expect("adjust task panicked");
            debug!(%name, ok, "adjust settled");
            if let Some(record) = records.get_mut(&name) {
                if ok {
                    record.state = PeerState::TimeUpdated;
                    record.delta_ms = delta;
                } else {
                    record.state = PeerState::TimeErrorSentUpdate;
                }
            }
        }
    }

    async fn phase_close(&self, records: &mut HashMap<String, ParticipantRecord>) {
        let targets: Vec<ParticipantRecord> = records
            .values()
            .filter(|record| record.state == PeerState::TimeUpdated)
            .cloned()
            .collect();

        let mut tasks = JoinSet::new();
        for record in targets {
            let transport = self.transport.clone();
            let timeout = self.timeout;
            let leader_address = self.address.clone();
            tasks.spawn(async move {
                let request = codec::encode_request(&Request::Close {
                    message: "Cerrar conexion".into(),
                    leader_address,
                });
                let outcome = transport
                    .send_request(&record.address, &request, timeout)
                    .await;
                let ok = matches!(
                    outcome.map(|bytes| codec::decode_reply(&bytes)),
                    Ok(Ok(Reply::Closed { .. }))
                );
                (record.name, ok)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (name, ok) = joined.expect("close task panicked");
            debug!(%name, ok, "close settled");
            if let Some(record) = records.get_mut(&name) {
                record.state = if ok {
                    PeerState::OkClose
                } else {
                    PeerState::ErrorClose
                };
            }
        }
    }
}
