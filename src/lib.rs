pub mod config;
pub mod date_cursor;
pub mod decompose;
pub mod errors;
pub mod models;
pub mod reconciler;
pub mod session;
pub mod state;
pub mod transport;
pub mod ui;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use date_cursor::DateCursor;
pub use decompose::{Decomposition, decompose};
pub use models::{CategoryKey, CounterMap, Direction, Mode, Scope};
pub use reconciler::{MutationReconciler, Notice, PendingAdjustment, Settlement};
pub use session::{Session, SessionView};
pub use transport::{CounterTransport, HttpTransport};
