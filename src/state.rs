use crate::models::{CategoryKey, CounterMap, Direction, Scope};
use std::collections::BTreeMap;

/// Position of a snapshot fetch in its scope's write order. The default
/// ticket predates every write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FetchTicket(u64);

/// Load status of one scope's authoritative snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScopeLoad {
    #[default]
    Loading,
    Ready(CounterMap),
    Failed(String),
}

/// Orders snapshot fetches against local writes to a scope's base. Both
/// draw from the same counter, so a response is stale once anything newer
/// than its fetch has been applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct WriteClock {
    issued: u64,
    applied: u64,
}

impl WriteClock {
    fn tick(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }
}

/// Client-side view of the counter store plus the deltas of unsettled
/// adjustments, keyed by scope and category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerState {
    scopes: BTreeMap<Scope, ScopeLoad>,
    pending: BTreeMap<(Scope, CategoryKey), i64>,
    clocks: BTreeMap<Scope, WriteClock>,
}

impl LedgerState {
    pub fn load(&self, scope: &Scope) -> &ScopeLoad {
        const LOADING: &ScopeLoad = &ScopeLoad::Loading;
        self.scopes.get(scope).unwrap_or(LOADING)
    }

    /// Committed value for a category, `None` until the scope has loaded.
    pub fn committed(&self, scope: &Scope, key: &CategoryKey) -> Option<u32> {
        match self.load(scope) {
            ScopeLoad::Ready(counts) => Some(counts.get(key).copied().unwrap_or(0)),
            _ => None,
        }
    }

    pub fn pending(&self, scope: &Scope, key: &CategoryKey) -> i64 {
        self.pending
            .get(&(*scope, key.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn pending_in(&self, scope: &Scope) -> BTreeMap<CategoryKey, i64> {
        self.pending
            .iter()
            .filter(|((pending_scope, _), _)| pending_scope == scope)
            .map(|((_, key), delta)| (key.clone(), *delta))
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub(crate) fn record_pending(&mut self, scope: Scope, key: CategoryKey, direction: Direction) {
        *self.pending.entry((scope, key)).or_insert(0) += direction.delta();
    }

    /// Removes exactly one request's contribution. Entries that reach zero are
    /// dropped so the map only holds keys with work in flight.
    pub(crate) fn undo_pending(&mut self, scope: Scope, key: CategoryKey, direction: Direction) {
        let slot = (scope, key);
        let remaining = self.pending.get(&slot).copied().unwrap_or(0) - direction.delta();
        if remaining == 0 {
            self.pending.remove(&slot);
        } else {
            self.pending.insert(slot, remaining);
        }
    }

    /// Applies a confirmed adjustment to the cached base. Returns `false` when
    /// the scope has no loaded base to patch.
    pub(crate) fn patch_committed(
        &mut self,
        scope: &Scope,
        key: &CategoryKey,
        direction: Direction,
    ) -> bool {
        let Some(ScopeLoad::Ready(counts)) = self.scopes.get_mut(scope) else {
            return false;
        };
        let entry = counts.entry(key.clone()).or_insert(0);
        *entry = match direction {
            Direction::Increase => entry.saturating_add(1),
            Direction::Decrease => entry.saturating_sub(1),
        };
        let clock = self.clocks.entry(*scope).or_default();
        clock.applied = clock.tick();
        true
    }

    /// Ticket for a snapshot fetch that is about to start.
    pub(crate) fn begin_fetch(&mut self, scope: Scope) -> FetchTicket {
        FetchTicket(self.clocks.entry(scope).or_default().tick())
    }

    /// Installs a fetched snapshot unless something newer than the fetch was
    /// applied meanwhile. Returns whether the snapshot was installed.
    pub(crate) fn replace_committed(
        &mut self,
        scope: Scope,
        counts: CounterMap,
        ticket: FetchTicket,
    ) -> bool {
        if !self.settle_fetch(scope, ticket) {
            return false;
        }
        self.scopes.insert(scope, ScopeLoad::Ready(counts));
        true
    }

    /// Puts the scope into the error state, under the same staleness rule as
    /// [`replace_committed`](Self::replace_committed).
    pub(crate) fn mark_failed(
        &mut self,
        scope: Scope,
        message: String,
        ticket: FetchTicket,
    ) -> bool {
        if !self.settle_fetch(scope, ticket) {
            return false;
        }
        self.scopes.insert(scope, ScopeLoad::Failed(message));
        true
    }

    fn settle_fetch(&mut self, scope: Scope, FetchTicket(seq): FetchTicket) -> bool {
        let clock = self.clocks.entry(scope).or_default();
        if seq <= clock.applied {
            return false;
        }
        clock.applied = seq;
        true
    }
}
