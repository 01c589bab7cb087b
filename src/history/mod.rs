//! In-process record of submitted batches.
pub mod ledger;

pub use ledger::{HistoryLedger, HistoryRecord};
