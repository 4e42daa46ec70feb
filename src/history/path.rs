//! Key paths into a history: `(epochs, key)` or `(epochs, batches, key)`

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Index or slice over epochs or batches; negative values count from the end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Index(isize),
    Slice { start: Option<isize>, stop: Option<isize> },
}

impl Selector {
    /// Select everything (`:`)
    pub const ALL: Selector = Selector::Slice { start: None, stop: None };

    pub fn is_slice(&self) -> bool {
        matches!(self, Selector::Slice { .. })
    }

    /// Resolve an index against a length
    pub(crate) fn resolve_index(idx: isize, len: usize) -> Result<usize> {
        let len_i = len as isize;
        let pos = if idx < 0 { len_i + idx } else { idx };
        if pos < 0 || pos >= len_i {
            return Err(Error::History(format!(
                "index {idx} is out of range for {len} entries"
            )));
        }
        Ok(pos as usize)
    }

    /// Resolve slice bounds against `len`; out-of-range bounds clamp, never fail
    pub(crate) fn resolve_range(
        start: Option<isize>,
        stop: Option<isize>,
        len: usize,
    ) -> std::ops::Range<usize> {
        let len_i = len as isize;
        let clamp = |v: isize| -> usize {
            let v = if v < 0 { len_i + v } else { v };
            v.clamp(0, len_i) as usize
        };
        let lo = start.map_or(0, clamp);
        let hi = stop.map_or(len, clamp);
        lo..hi.max(lo)
    }
}

impl From<isize> for Selector {
    fn from(idx: isize) -> Self {
        Selector::Index(idx)
    }
}

impl From<i32> for Selector {
    fn from(idx: i32) -> Self {
        Selector::Index(idx as isize)
    }
}

impl From<std::ops::RangeFull> for Selector {
    fn from(_: std::ops::RangeFull) -> Self {
        Selector::ALL
    }
}

impl FromStr for Selector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let parse_bound = |b: &str| -> Result<Option<isize>> {
            let b = b.trim();
            if b.is_empty() {
                Ok(None)
            } else {
                b.parse::<isize>()
                    .map(Some)
                    .map_err(|_| Error::History(format!("invalid slice bound '{b}'")))
            }
        };
        match s.split_once(':') {
            Some((lo, hi)) => Ok(Selector::Slice { start: parse_bound(lo)?, stop: parse_bound(hi)? }),
            None => s
                .parse::<isize>()
                .map(Selector::Index)
                .map_err(|_| Error::History(format!("invalid index '{s}'"))),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Index(i) => write!(f, "{i}"),
            Selector::Slice { start, stop } => {
                if let Some(s) = start {
                    write!(f, "{s}")?;
                }
                write!(f, ":")?;
                if let Some(s) = stop {
                    write!(f, "{s}")?;
                }
                Ok(())
            }
        }
    }
}

/// A structured lookup into a [`History`](super::History)
///
/// Text form, comma separated: `-1,train_loss`, `:,valid_loss`,
/// `-1,batches,:,train_loss`, `2:4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPath {
    pub epochs: Selector,
    /// Batch selector; `key` then applies to batch records
    pub batches: Option<Selector>,
    pub key: Option<String>,
}

impl HistoryPath {
    /// Whole epoch record(s)
    pub fn epochs(epochs: impl Into<Selector>) -> Self {
        Self { epochs: epochs.into(), batches: None, key: None }
    }

    /// A key of the selected epoch(s)
    pub fn key(epochs: impl Into<Selector>, key: impl Into<String>) -> Self {
        Self { epochs: epochs.into(), batches: None, key: Some(key.into()) }
    }

    /// A key of the selected batch(es) of the selected epoch(s)
    pub fn batch_key(
        epochs: impl Into<Selector>,
        batches: impl Into<Selector>,
        key: impl Into<String>,
    ) -> Self {
        Self { epochs: epochs.into(), batches: Some(batches.into()), key: Some(key.into()) }
    }
}

impl FromStr for HistoryPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let epochs: Selector = parts[0].parse()?;
        match parts.as_slice() {
            [_] => Ok(HistoryPath { epochs, batches: None, key: None }),
            [_, key] => Ok(HistoryPath { epochs, batches: None, key: Some((*key).to_string()) }),
            [_, b, sel] if *b == super::BATCHES => {
                Ok(HistoryPath { epochs, batches: Some(sel.parse()?), key: None })
            }
            [_, b, sel, key] if *b == super::BATCHES => Ok(HistoryPath {
                epochs,
                batches: Some(sel.parse()?),
                key: Some((*key).to_string()),
            }),
            _ => Err(Error::History(format!("cannot parse history path '{s}'"))),
        }
    }
}

impl fmt::Display for HistoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.epochs)?;
        if let Some(b) = &self.batches {
            write!(f, ",{},{b}", super::BATCHES)?;
        }
        if let Some(k) = &self.key {
            write!(f, ",{k}")?;
        }
        Ok(())
    }
}
