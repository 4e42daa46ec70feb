//! The `History` store and its persistence

use super::path::{HistoryPath, Selector};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Key under which an epoch record keeps its batch records
pub const BATCHES: &str = "batches";

/// One epoch (or batch) record
pub type Record = Map<String, Value>;

/// Append-only per-epoch ledger filled during fitting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    records: Vec<Record>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of epochs recorded
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Epoch record by index (negative counts from the end)
    pub fn epoch(&self, idx: isize) -> Result<&Record> {
        let pos = Selector::resolve_index(idx, self.records.len())?;
        Ok(&self.records[pos])
    }

    /// Append an empty epoch record with an empty batch list
    pub fn new_epoch(&mut self) {
        let mut record = Record::new();
        record.insert(BATCHES.to_string(), Value::Array(Vec::new()));
        self.records.push(record);
    }

    /// Append an empty batch record to the last epoch
    pub fn new_batch(&mut self) -> Result<()> {
        let batches = self.last_batches_mut()?;
        batches.push(Value::Object(Record::new()));
        Ok(())
    }

    /// Set a key on the last epoch
    pub fn record(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let last = self
            .records
            .last_mut()
            .ok_or_else(|| Error::History("cannot record before the first epoch".into()))?;
        last.insert(key.into(), value.into());
        Ok(())
    }

    /// Set a key on the last batch of the last epoch
    pub fn record_batch(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let batch = self
            .last_batches_mut()?
            .last_mut()
            .and_then(Value::as_object_mut)
            .ok_or_else(|| Error::History("cannot record before the first batch".into()))?;
        batch.insert(key.into(), value.into());
        Ok(())
    }

    fn last_batches_mut(&mut self) -> Result<&mut Vec<Value>> {
        let last = self
            .records
            .last_mut()
            .ok_or_else(|| Error::History("cannot add a batch before the first epoch".into()))?;
        let entry = last.entry(BATCHES).or_insert_with(|| Value::Array(Vec::new()));
        entry
            .as_array_mut()
            .ok_or_else(|| Error::History(format!("'{BATCHES}' is not a list")))
    }

    /// Structured lookup, see [`HistoryPath`]
    pub fn get(&self, path: &HistoryPath) -> Result<Value> {
        match path.epochs {
            Selector::Index(idx) => {
                let record = self.epoch(idx)?;
                lookup_epoch(record, path)
            }
            Selector::Slice { start, stop } => {
                let range = Selector::resolve_range(start, stop, self.records.len());
                let records = &self.records[range];
                let mut out = Vec::with_capacity(records.len());
                let mut last_err = None;
                for record in records {
                    match lookup_epoch(record, path) {
                        Ok(v) => out.push(v),
                        Err(e) => last_err = Some(e),
                    }
                }
                match last_err {
                    Some(e) if out.is_empty() => Err(e),
                    _ => Ok(Value::Array(out)),
                }
            }
        }
    }

    /// Float value of `key` in the last epoch, if present and numeric
    pub fn last_f64(&self, key: &str) -> Option<f64> {
        self.records.last()?.get(key)?.as_f64()
    }

    /// Float values of `key` across epochs that have it
    pub fn column_f64(&self, key: &str) -> Vec<f64> {
        self.records.iter().filter_map(|r| r.get(key).and_then(Value::as_f64)).collect()
    }

    /// Number of batch records in an epoch that carry `key`
    pub fn count_batches_with(&self, idx: isize, key: &str) -> usize {
        self.epoch(idx)
            .ok()
            .and_then(|r| r.get(BATCHES))
            .and_then(Value::as_array)
            .map_or(0, |b| b.iter().filter(|b| b.get(key).is_some()).count())
    }

    /// Serialize as a JSON array of records
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.records)?)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, &self.records)?;
        Ok(())
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }
}

impl From<Vec<Record>> for History {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}

fn key_not_found(key: &str) -> Error {
    Error::History(format!("key '{key}' was not found"))
}

/// Resolve the part of `path` below the epoch selector for one record
fn lookup_epoch(record: &Record, path: &HistoryPath) -> Result<Value> {
    let Some(batch_sel) = path.batches else {
        return match &path.key {
            None => Ok(Value::Object(record.clone())),
            Some(key) => record.get(key).cloned().ok_or_else(|| key_not_found(key)),
        };
    };

    let batches = record
        .get(BATCHES)
        .and_then(Value::as_array)
        .ok_or_else(|| key_not_found(BATCHES))?;

    match batch_sel {
        Selector::Index(idx) => {
            let pos = Selector::resolve_index(idx, batches.len())?;
            pick(&batches[pos], path.key.as_deref())
        }
        Selector::Slice { start, stop } => {
            let range = Selector::resolve_range(start, stop, batches.len());
            let selected = &batches[range];
            let Some(key) = path.key.as_deref() else {
                return Ok(Value::Array(selected.to_vec()));
            };
            let values: Vec<Value> =
                selected.iter().filter_map(|b| b.get(key).cloned()).collect();
            if values.is_empty() && !selected.is_empty() {
                return Err(key_not_found(key));
            }
            Ok(Value::Array(values))
        }
    }
}

fn pick(value: &Value, key: Option<&str>) -> Result<Value> {
    match key {
        None => Ok(value.clone()),
        Some(key) => value.get(key).cloned().ok_or_else(|| key_not_found(key)),
    }
}
