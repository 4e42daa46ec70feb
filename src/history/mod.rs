//! Training history ledger
//!
//! An append-only list of epoch records. Each record maps string keys
//! (`epoch`, `train_loss`, `valid_loss`, `dur`, ...) to JSON values; the
//! `batches` key holds the per-batch records of that epoch.
//!
//! ```
//! use skorch::history::{History, HistoryPath};
//!
//! let mut history = History::new();
//! history.new_epoch();
//! history.record("train_loss", 0.5).unwrap();
//! history.new_batch().unwrap();
//! history.record_batch("train_loss", 0.6).unwrap();
//!
//! let path: HistoryPath = "-1,batches,-1,train_loss".parse().unwrap();
//! assert_eq!(history.get(&path).unwrap(), serde_json::json!(0.6));
//! ```

mod path;
mod store;

#[cfg(test)]
mod tests;

pub use path::{HistoryPath, Selector};
pub use store::{History, Record, BATCHES};
