use crate::date_cursor::DateCursor;
use crate::decompose::{Decomposition, decompose};
use crate::errors::TransportError;
use crate::models::{CategoryKey, Direction, Mode, Scope};
use crate::reconciler::{MutationReconciler, PendingAdjustment};
use crate::state::{LedgerState, ScopeLoad};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRow {
    pub category: CategoryKey,
    pub committed: u32,
    pub pending: i64,
    pub goal: u32,
    pub decomposition: Decomposition,
    /// Decrease control state: off once committed plus pending reaches zero.
    pub can_decrease: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionView {
    Loading,
    Error(String),
    Ready {
        mode: Mode,
        scope: Scope,
        rows: Vec<CategoryRow>,
    },
}

/// What the user is looking at: a mode, a day and the shared reconciler.
pub struct Session {
    reconciler: MutationReconciler,
    categories: Vec<CategoryKey>,
    mode: Mode,
    cursor: DateCursor,
}

impl Session {
    pub fn new(reconciler: MutationReconciler, categories: Vec<CategoryKey>) -> Self {
        Self::starting_on(reconciler, categories, DateCursor::today())
    }

    pub fn starting_on(
        reconciler: MutationReconciler,
        categories: Vec<CategoryKey>,
        today: DateCursor,
    ) -> Self {
        Self {
            reconciler,
            categories,
            mode: Mode::Portions,
            cursor: today,
        }
    }

    pub fn reconciler(&self) -> &MutationReconciler {
        &self.reconciler
    }

    pub fn categories(&self) -> &[CategoryKey] {
        &self.categories
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn cursor(&self) -> DateCursor {
        self.cursor
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.set_mode_on(mode, DateCursor::today());
    }

    /// Switching modes always drops any navigation offset.
    pub fn set_mode_on(&mut self, mode: Mode, today: DateCursor) {
        debug!(?mode, %today, "switching mode");
        self.mode = mode;
        self.cursor = today;
    }

    pub fn previous_day(&mut self) {
        self.cursor = self.cursor.previous_day();
    }

    pub fn next_day(&mut self) {
        self.cursor = self.cursor.next_day();
    }

    pub fn go_to(&mut self, cursor: DateCursor) {
        self.cursor = cursor;
    }

    pub fn active_scope(&self) -> Scope {
        match self.mode {
            Mode::Portions => Scope::Day(self.cursor),
            Mode::Goals => Scope::Goals,
        }
    }

    /// Fetches everything the current view needs.
    pub async fn load(&self) -> Result<(), TransportError> {
        match self.mode {
            Mode::Portions => {
                let (day, goals) = tokio::join!(
                    self.reconciler.refresh(self.active_scope()),
                    self.reconciler.refresh(Scope::Goals)
                );
                day?;
                goals?;
            }
            Mode::Goals => {
                self.reconciler.refresh(Scope::Goals).await?;
            }
        }
        Ok(())
    }

    pub fn apply(&self, category: &CategoryKey, direction: Direction) -> PendingAdjustment {
        self.reconciler
            .apply(self.active_scope(), category.clone(), direction)
    }

    pub fn can_decrease(&self, category: &CategoryKey) -> bool {
        let scope = self.active_scope();
        let state = self.reconciler.snapshot();
        let committed = state.committed(&scope, category).unwrap_or(0);
        i64::from(committed) + state.pending(&scope, category) > 0
    }

    pub fn view(&self) -> SessionView {
        self.view_of(&self.reconciler.snapshot())
    }

    /// Builds the view from a given state, e.g. one received from
    /// [`MutationReconciler::subscribe`].
    pub fn view_of(&self, state: &LedgerState) -> SessionView {
        let scope = self.active_scope();
        let counts = match state.load(&scope) {
            ScopeLoad::Loading => return SessionView::Loading,
            ScopeLoad::Failed(message) => return SessionView::Error(message.clone()),
            ScopeLoad::Ready(counts) => counts,
        };
        let goals = match self.mode {
            Mode::Goals => None,
            Mode::Portions => match state.load(&Scope::Goals) {
                ScopeLoad::Loading => return SessionView::Loading,
                ScopeLoad::Failed(message) => return SessionView::Error(message.clone()),
                ScopeLoad::Ready(goals) => Some(goals),
            },
        };

        let rows = self
            .categories
            .iter()
            .map(|category| {
                let committed = counts.get(category).copied().unwrap_or(0);
                let pending = state.pending(&scope, category);
                let goal = goals
                    .and_then(|goals| goals.get(category).copied())
                    .unwrap_or(0);
                CategoryRow {
                    category: category.clone(),
                    committed,
                    pending,
                    goal,
                    decomposition: decompose(committed, pending, goal),
                    can_decrease: i64::from(committed) + pending > 0,
                }
            })
            .collect();

        SessionView::Ready {
            mode: self.mode,
            scope,
            rows,
        }
    }
}
