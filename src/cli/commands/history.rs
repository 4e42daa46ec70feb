//! History command: print a saved history or a query into it

use crate::config::HistoryArgs;
use crate::history::{History, HistoryPath};
use crate::Result;

pub fn query_history(args: &HistoryArgs) -> Result<String> {
    let history = History::load(&args.file)?;
    let value = match &args.path {
        Some(path) => history.get(&path.parse::<HistoryPath>()?)?,
        None => serde_json::to_value(&history)?,
    };
    Ok(serde_json::to_string_pretty(&value)?)
}

pub fn run_history(args: &HistoryArgs) -> Result<()> {
    println!("{}", query_history(args)?);
    Ok(())
}
