//! Parameter groups selected by glob patterns over parameter names

use crate::params::{ParamValue, Params};
use crate::{Error, Result};
use regex::Regex;

/// A subset of module parameters sharing hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGroup {
    /// Glob pattern that selected the members, `None` for the default group
    pub pattern: Option<String>,
    pub lr: f64,
    /// Indices into the module's parameter list
    pub members: Vec<usize>,
    /// Per-group overrides such as `momentum` or `weight_decay`
    pub options: Params,
}

impl ParamGroup {
    pub fn option_f64(&self, key: &str, default: f64) -> Result<f64> {
        self.options.f64_or(key, default)
    }
}

/// Translate a shell-style glob (`*`, `?`) into an anchored regex
pub fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| Error::InvalidValue {
        key: "param_groups".into(),
        reason: format!("bad pattern '{pattern}': {e}"),
    })
}

/// Parse `param_groups`: a list of `[pattern, {options}]` pairs
pub fn parse_group_specs(value: &ParamValue) -> Result<Vec<(String, Params)>> {
    let invalid = |reason: String| Error::InvalidValue { key: "param_groups".into(), reason };
    let list = value
        .as_list()
        .ok_or_else(|| invalid(format!("expected a list of (pattern, options), got {value}")))?;
    list.iter()
        .map(|entry| match entry.as_list() {
            Some([ParamValue::Str(pattern), ParamValue::Map(options)]) => Ok((
                pattern.clone(),
                options.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            )),
            _ => Err(invalid(format!("expected (pattern, options), got {entry}"))),
        })
        .collect()
}

/// Assign each parameter to the first matching pattern; the rest form a
/// trailing default group with `default_lr`
///
/// Pattern groups that match nothing are dropped.
pub fn build_param_groups(
    names: &[String],
    specs: &[(String, Params)],
    default_lr: f64,
) -> Result<Vec<ParamGroup>> {
    let mut assigned = vec![false; names.len()];
    let mut groups = Vec::with_capacity(specs.len() + 1);
    for (pattern, options) in specs {
        let re = glob_to_regex(pattern)?;
        let members: Vec<usize> = names
            .iter()
            .enumerate()
            .filter(|(i, name)| !assigned[*i] && re.is_match(name))
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            continue;
        }
        for &i in &members {
            assigned[i] = true;
        }
        let mut options = options.clone();
        let lr = match options.remove("lr") {
            Some(v) => v.as_f64().ok_or_else(|| Error::InvalidValue {
                key: "param_groups".into(),
                reason: format!("lr for '{pattern}' must be a number, got {v}"),
            })?,
            None => default_lr,
        };
        groups.push(ParamGroup { pattern: Some(pattern.clone()), lr, members, options });
    }
    let rest: Vec<usize> = (0..names.len()).filter(|&i| !assigned[i]).collect();
    if !rest.is_empty() || groups.is_empty() {
        groups.push(ParamGroup { pattern: None, lr: default_lr, members: rest, options: Params::new() });
    }
    Ok(groups)
}
