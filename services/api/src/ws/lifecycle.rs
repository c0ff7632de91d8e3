//! Per-session lifecycle state shared between the relay and the supervisor.

use serde::Serialize;
use std::sync::{
    OnceLock,
    atomic::{AtomicU8, AtomicU64, AtomicUsize, Ordering},
};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum SessionState {
    Connecting = 0,
    Active = 1,
    Closing = 2,
    Closed = 3,
}

impl SessionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SessionState::Connecting,
            1 => SessionState::Active,
            2 => SessionState::Closing,
            _ => SessionState::Closed,
        }
    }
}

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    protocol: Option<String>,
    state: AtomicU8,
    /// Set once, when the upstream opens.
    upstream: OnceLock<()>,
    /// Tool batches started but not yet answered.
    batches_in_flight: AtomicUsize,
    tool_batches: AtomicU64,
    turns: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub state: SessionState,
    pub protocol: Option<String>,
    pub upstream_open: bool,
    pub tool_in_use: bool,
    pub tool_batches: u64,
    pub turns: u64,
}

impl Session {
    pub fn new(protocol: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            protocol,
            state: AtomicU8::new(SessionState::Connecting as u8),
            upstream: OnceLock::new(),
            batches_in_flight: AtomicUsize::new(0),
            tool_batches: AtomicU64::new(0),
            turns: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Records that the upstream is established. Returns `false` if it was
    /// already opened once or the session is past `Connecting`.
    pub fn mark_upstream_open(&self) -> bool {
        if self.upstream.set(()).is_err() {
            return false;
        }
        self.state
            .compare_exchange(
                SessionState::Connecting as u8,
                SessionState::Active as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub fn upstream_open(&self) -> bool {
        self.upstream.get().is_some()
    }

    /// Moves to `Closing`. Only the first caller gets `true`; every later
    /// call is a no-op.
    pub fn begin_close(&self) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current >= SessionState::Closing as u8 {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                SessionState::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn finish_close(&self) {
        self.state.store(SessionState::Closed as u8, Ordering::Release);
        self.batches_in_flight.store(0, Ordering::Release);
    }

    pub fn batch_started(&self) {
        self.tool_batches.fetch_add(1, Ordering::Relaxed);
        self.batches_in_flight.fetch_add(1, Ordering::AcqRel);
    }

    /// Saturates at zero: a turn end may already have cleared the count.
    pub fn batch_answered(&self) {
        let _ = self
            .batches_in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    /// `turnComplete` or `interrupted` from the model.
    pub fn record_turn_end(&self) {
        self.turns.fetch_add(1, Ordering::Relaxed);
        self.batches_in_flight.store(0, Ordering::Release);
    }

    pub fn tool_in_use(&self) -> bool {
        self.batches_in_flight.load(Ordering::Acquire) > 0
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            state: self.state(),
            protocol: self.protocol.clone(),
            upstream_open: self.upstream_open(),
            tool_in_use: self.tool_in_use(),
            tool_batches: self.tool_batches.load(Ordering::Relaxed),
            turns: self.turns.load(Ordering::Relaxed),
        }
    }
}
