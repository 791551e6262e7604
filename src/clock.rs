use std::{
    sync::atomic::{AtomicI64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

pub trait ClockSource: Send + Sync {
    fn now_ms(&self) -> i64;

    // default is a no-op: ScriptedClock hands back a pre-programmed
    // sequence regardless of what the handler asks of it
    fn apply_offset(&self, _delta_ms: i64) {}
}

// UPDATE_TIME shifts `offset_ms` rather than the OS clock itself; see
// participant::handler for why
#[derive(Debug, Default)]
pub struct SystemClock {
    offset_ms: AtomicI64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset_ms(&self) -> i64 {
        self.offset_ms.load(Ordering::SeqCst)
    }
}

impl ClockSource for SystemClock {
    fn now_ms(&self) -> i64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the unix epoch")
            .as_millis() as i64;
        wall + self.offset_ms.load(Ordering::SeqCst)
    }

    fn apply_offset(&self, delta_ms: i64) {
        self.offset_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

// replays a fixed sequence of readings, falling back to the last one once
// exhausted
#[derive(Debug)]
pub struct ScriptedClock {
    readings: std::sync::Mutex<std::collections::VecDeque<i64>>,
    last: AtomicI64,
}

impl ScriptedClock {
    pub fn new(readings: impl IntoIterator<Item = i64>) -> Self {
        let readings: std::collections::VecDeque<i64> = readings.into_iter().collect();
        let last = readings.back().copied().unwrap_or(0);
        Self {
            readings: std::sync::Mutex::new(readings),
            last: AtomicI64::new(last),
        }
    }
}

impl ClockSource for ScriptedClock {
    fn now_ms(&self) -> i64 {
        let mut readings = self.readings.lock().unwrap();
        match readings.pop_front() {
            Some(value) => {
                self.last.store(value, Ordering::SeqCst);
                value
            }
            None => self.last.load(Ordering::SeqCst),
        }
    }
}
