//! In-memory transport whose adjustments and reads complete only when a test says so.

use crate::date_cursor::DateCursor;
use crate::errors::TransportError;
use crate::models::{CategoryKey, CounterMap, Direction, Scope};
use crate::transport::CounterTransport;
use async_trait::async_trait;
use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::{mpsc, oneshot};

pub fn protein() -> CategoryKey {
    CategoryKey::new("protein").unwrap()
}

pub fn day() -> Scope {
    Scope::Day(DateCursor::from_ymd(2024, 3, 1).unwrap())
}

pub struct AdjustRequest {
    pub scope: Scope,
    pub key: CategoryKey,
    pub direction: Direction,
    pub reply: oneshot::Sender<Result<(), TransportError>>,
}

pub type Requests = mpsc::UnboundedReceiver<AdjustRequest>;

/// A snapshot read held back until the test releases it. The answer was
/// fixed when the read started.
pub struct HeldRead {
    pub release: oneshot::Sender<()>,
}

pub type Reads = mpsc::UnboundedReceiver<HeldRead>;

pub struct ScriptedTransport {
    counts: Mutex<CounterMap>,
    fail_reads: AtomicBool,
    requests: mpsc::UnboundedSender<AdjustRequest>,
    held_reads: Mutex<Option<mpsc::UnboundedSender<HeldRead>>>,
}

impl ScriptedTransport {
    pub fn new(counts: CounterMap) -> (Self, Requests) {
        let (requests, receiver) = mpsc::unbounded_channel();
        let transport = Self {
            counts: Mutex::new(counts),
            fail_reads: AtomicBool::new(false),
            requests,
            held_reads: Mutex::new(None),
        };
        (transport, receiver)
    }

    pub fn failure() -> TransportError {
        TransportError::Status {
            status: 503,
            message: "unreachable".into(),
        }
    }

    pub fn set_counts(&self, counts: CounterMap) {
        *self.counts.lock().unwrap() = counts;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// From now on every snapshot read waits for its release.
    pub fn gate_reads(&self) -> Reads {
        let (sender, receiver) = mpsc::unbounded_channel();
        *self.held_reads.lock().unwrap() = Some(sender);
        receiver
    }
}

#[async_trait]
impl CounterTransport for ScriptedTransport {
    async fn fetch_counters(&self, _scope: &Scope) -> Result<CounterMap, TransportError> {
        let answer = if self.fail_reads.load(Ordering::SeqCst) {
            Err(Self::failure())
        } else {
            Ok(self.counts.lock().unwrap().clone())
        };
        let gate = self.held_reads.lock().unwrap().clone();
        if let Some(gate) = gate {
            let (release, released) = oneshot::channel();
            gate.send(HeldRead { release }).map_err(|_| Self::failure())?;
            released.await.map_err(|_| Self::failure())?;
        }
        answer
    }

    async fn adjust_counter(
        &self,
        scope: &Scope,
        key: &CategoryKey,
        direction: Direction,
    ) -> Result<(), TransportError> {
        let (reply, outcome) = oneshot::channel();
        self.requests
            .send(AdjustRequest {
                scope: *scope,
                key: key.clone(),
                direction,
                reply,
            })
            .map_err(|_| Self::failure())?;
        outcome.await.unwrap_or_else(|_| Err(Self::failure()))
    }
}
