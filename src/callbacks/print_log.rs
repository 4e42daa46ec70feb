//! Per-epoch table of history values

use super::traits::{check_keys, Callback, CallbackAction, EpochContext};
use crate::history::{Record, BATCHES};
use crate::net::NeuralNet;
use crate::params::Params;
use crate::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// Where [`PrintLog`] writes
#[derive(Clone, Default)]
pub enum Sink {
    #[default]
    Stdout,
    Stderr,
    /// Discard output
    None,
    /// Append to a shared string, for capturing output
    Buffer(Arc<Mutex<String>>),
}

impl Sink {
    pub fn buffer() -> (Sink, Arc<Mutex<String>>) {
        let buf = Arc::new(Mutex::new(String::new()));
        (Sink::Buffer(Arc::clone(&buf)), buf)
    }

    pub fn write_line(&self, line: &str) -> Result<()> {
        match self {
            Sink::Stdout => writeln!(std::io::stdout().lock(), "{line}")?,
            Sink::Stderr => writeln!(std::io::stderr().lock(), "{line}")?,
            Sink::None => {}
            Sink::Buffer(buf) => {
                let mut buf = buf
                    .lock()
                    .map_err(|_| Error::Io(std::io::Error::other("print_log buffer poisoned")))?;
                buf.push_str(line);
                buf.push('\n');
            }
        }
        Ok(())
    }
}

impl fmt::Display for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sink::Stdout => "stdout",
            Sink::Stderr => "stderr",
            Sink::None => "none",
            Sink::Buffer(_) => "buffer",
        })
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sink({self})")
    }
}

impl FromStr for Sink {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "stdout" => Ok(Sink::Stdout),
            "stderr" => Ok(Sink::Stderr),
            "none" | "null" => Ok(Sink::None),
            other => Err(Error::InvalidValue {
                key: "sink".into(),
                reason: format!("expected stdout, stderr or none, got '{other}'"),
            }),
        }
    }
}

/// Prints one table row per epoch, with a header before the first
///
/// Columns: `epoch`, then the remaining keys sorted, then `dur`. Batch
/// records, `*_best` flags and `keys_ignored` are left out. Nothing is
/// printed when the net's `verbose` is 0.
#[derive(Debug, Clone, Default)]
pub struct PrintLog {
    pub sink: Sink,
    pub keys_ignored: Vec<String>,
    widths: Vec<(String, usize)>,
}

impl PrintLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(sink: Sink) -> Self {
        Self { sink, ..Self::default() }
    }

    fn columns(&self, record: &Record) -> Vec<String> {
        let mut keys: Vec<String> = record
            .keys()
            .filter(|k| {
                k.as_str() != BATCHES
                    && k.as_str() != "epoch"
                    && k.as_str() != "dur"
                    && !k.ends_with("_best")
                    && !self.keys_ignored.iter().any(|i| i == *k)
            })
            .cloned()
            .collect();
        keys.sort();
        let mut columns = Vec::with_capacity(keys.len() + 2);
        if record.contains_key("epoch") {
            columns.push("epoch".to_string());
        }
        columns.extend(keys);
        if record.contains_key("dur") {
            columns.push("dur".to_string());
        }
        columns
    }

    /// Table lines for the last history record
    pub fn format_record(&mut self, record: &Record) -> Vec<String> {
        let mut lines = Vec::new();
        if self.widths.is_empty() {
            self.widths = self
                .columns(record)
                .into_iter()
                .map(|key| {
                    let width = key.len().max(format_value(record.get(&key)).len());
                    (key, width)
                })
                .collect();
            let header: Vec<String> = self.widths.iter().map(|(k, w)| format!("{k:>w$}")).collect();
            let rule: Vec<String> = self.widths.iter().map(|(_, w)| "-".repeat(*w)).collect();
            lines.push(header.join("  "));
            lines.push(rule.join("  "));
        }
        let cells: Vec<String> = self
            .widths
            .iter()
            .map(|(k, w)| format!("{:>w$}", format_value(record.get(k))))
            .collect();
        lines.push(cells.join("  "));
        lines
    }
}

fn format_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::Number(n)) if n.is_f64() => format!("{:.4}", n.as_f64().unwrap_or_default()),
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
    }
}

impl Callback for PrintLog {
    fn initialize(&mut self) -> Result<()> {
        self.widths.clear();
        Ok(())
    }

    fn on_epoch_end(&mut self, net: &mut NeuralNet, _ctx: &EpochContext<'_>) -> Result<CallbackAction> {
        if net.verbose() == 0 {
            return Ok(CallbackAction::Continue);
        }
        let record = net.history().epoch(-1)?.clone();
        for line in self.format_record(&record) {
            self.sink.write_line(&line)?;
        }
        Ok(CallbackAction::Continue)
    }

    fn get_params(&self) -> Params {
        Params::new()
            .with("sink", self.sink.to_string())
            .with("keys_ignored", self.keys_ignored.clone())
    }

    fn set_params(&mut self, params: &Params) -> Result<()> {
        check_keys(params, &["sink", "keys_ignored"], self.type_name())?;
        if let Some(sink) = params.get("sink") {
            self.sink = match sink.as_str() {
                Some(s) => s.parse()?,
                None if sink.is_null() => Sink::None,
                None => {
                    return Err(Error::InvalidValue {
                        key: "sink".into(),
                        reason: format!("expected a sink name, got {sink}"),
                    })
                }
            };
        }
        if let Some(keys) = params.get("keys_ignored") {
            self.keys_ignored = match (keys.as_str(), keys.as_list()) {
                (Some(single), _) => vec![single.to_string()],
                (_, Some(list)) => list.iter().filter_map(|k| k.as_str().map(str::to_string)).collect(),
                _ if keys.is_null() => Vec::new(),
                _ => {
                    return Err(Error::InvalidValue {
                        key: "keys_ignored".into(),
                        reason: format!("expected a key or list of keys, got {keys}"),
                    })
                }
            };
        }
        Ok(())
    }

    fn type_name(&self) -> &str {
        "PrintLog"
    }
}
