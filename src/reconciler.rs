use crate::errors::TransportError;
use crate::models::{CategoryKey, CounterMap, Direction, Scope};
use crate::state::{FetchTicket, LedgerState};
use crate::transport::CounterTransport;
use std::{fmt, sync::Arc};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tracing::{debug, error, warn};

const NOTICE_CAPACITY: usize = 64;

/// Transient message for the user. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    AdjustmentFailed {
        scope: Scope,
        category: CategoryKey,
        direction: Direction,
        reason: String,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::AdjustmentFailed { .. } => {
                f.write_str("communication failure, check connectivity")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Committed,
    RolledBack,
}

/// Handle to one in-flight adjustment.
#[derive(Debug)]
pub struct PendingAdjustment {
    handle: JoinHandle<Settlement>,
}

impl PendingAdjustment {
    pub async fn settled(self) -> Settlement {
        match self.handle.await {
            Ok(settlement) => settlement,
            Err(err) => {
                error!("adjustment task did not complete: {err}");
                Settlement::RolledBack
            }
        }
    }
}

/// Optimistic adjustments against the remote counter store. Requests for the
/// same key may overlap and settle in any order; nothing is retried.
#[derive(Clone)]
pub struct MutationReconciler {
    transport: Arc<dyn CounterTransport>,
    state: Arc<watch::Sender<LedgerState>>,
    notices: broadcast::Sender<Notice>,
    refresh_after_settle: bool,
}

impl MutationReconciler {
    pub fn new(transport: Arc<dyn CounterTransport>) -> Self {
        let (state, _) = watch::channel(LedgerState::default());
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            transport,
            state: Arc::new(state),
            notices,
            refresh_after_settle: true,
        }
    }

    /// Whether each settlement triggers a background refresh of its scope.
    pub fn with_refresh_after_settle(mut self, enabled: bool) -> Self {
        self.refresh_after_settle = enabled;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<LedgerState> {
        self.state.subscribe()
    }

    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub fn snapshot(&self) -> LedgerState {
        self.state.borrow().clone()
    }

    pub fn pending(&self, scope: &Scope, key: &CategoryKey) -> i64 {
        self.state.borrow().pending(scope, key)
    }

    pub fn committed(&self, scope: &Scope, key: &CategoryKey) -> Option<u32> {
        self.state.borrow().committed(scope, key)
    }

    /// Records the pending delta and spawns the adjustment request. On
    /// settlement only this request's contribution is removed; a success
    /// patches the base in the same transition, a failure emits a [`Notice`].
    ///
    /// Must be called from within a tokio runtime. Non-negativity is the
    /// caller's concern.
    pub fn apply(&self, scope: Scope, key: CategoryKey, direction: Direction) -> PendingAdjustment {
        self.state
            .send_modify(|state| state.record_pending(scope, key.clone(), direction));
        debug!(%scope, category = %key, %direction, "adjustment issued");

        let reconciler = self.clone();
        let handle = tokio::spawn(async move { reconciler.settle(scope, key, direction).await });
        PendingAdjustment { handle }
    }

    async fn settle(&self, scope: Scope, key: CategoryKey, direction: Direction) -> Settlement {
        let result = self.transport.adjust_counter(&scope, &key, direction).await;
        let settlement = match result {
            Ok(()) => {
                self.state.send_modify(|state| {
                    if !state.patch_committed(&scope, &key, direction) {
                        debug!(%scope, "no cached base to patch");
                    }
                    state.undo_pending(scope, key.clone(), direction);
                });
                debug!(%scope, category = %key, %direction, "adjustment committed");
                Settlement::Committed
            }
            Err(err) => {
                warn!(%scope, category = %key, %direction, "adjustment rolled back: {err}");
                self.state
                    .send_modify(|state| state.undo_pending(scope, key.clone(), direction));
                // No receivers just means nobody is listening for notices.
                let _ = self.notices.send(Notice::AdjustmentFailed {
                    scope,
                    category: key,
                    direction,
                    reason: err.to_string(),
                });
                Settlement::RolledBack
            }
        };

        if self.refresh_after_settle {
            let reconciler = self.clone();
            tokio::spawn(async move { reconciler.background_refresh(scope).await });
        }
        settlement
    }

    /// Fetches the authoritative snapshot and overwrites the cached base.
    /// A failure puts the scope into the error state. Either outcome is
    /// dropped if a newer write to the base landed while the fetch ran; the
    /// server's answer is returned regardless.
    pub async fn refresh(&self, scope: Scope) -> Result<CounterMap, TransportError> {
        let ticket = self.begin_fetch(scope);
        match self.transport.fetch_counters(&scope).await {
            Ok(counts) => {
                self.install(scope, counts.clone(), ticket);
                Ok(counts)
            }
            Err(err) => {
                warn!(%scope, "failed to load counters: {err}");
                self.state
                    .send_if_modified(|state| state.mark_failed(scope, err.to_string(), ticket));
                Err(err)
            }
        }
    }

    /// Like [`refresh`](Self::refresh), but keeps the last good base on failure.
    async fn background_refresh(&self, scope: Scope) {
        let ticket = self.begin_fetch(scope);
        match self.transport.fetch_counters(&scope).await {
            Ok(counts) => self.install(scope, counts, ticket),
            Err(err) => debug!(%scope, "background refresh failed: {err}"),
        }
    }

    fn begin_fetch(&self, scope: Scope) -> FetchTicket {
        let mut ticket = FetchTicket::default();
        // Taking a ticket changes nothing a subscriber can observe.
        self.state.send_if_modified(|state| {
            ticket = state.begin_fetch(scope);
            false
        });
        ticket
    }

    fn install(&self, scope: Scope, counts: CounterMap, ticket: FetchTicket) {
        let installed = self
            .state
            .send_if_modified(|state| state.replace_committed(scope, counts, ticket));
        if !installed {
            debug!(%scope, "discarding stale snapshot");
        }
    }
}
