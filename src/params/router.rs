//! Compound-key splitting and routing

use super::value::Params;
use std::collections::BTreeMap;

/// Separator between a component selector and its residual key
pub const SEPARATOR: &str = "__";

/// Split `a__b__c` into `("a", Some("b__c"))`; plain keys give `(key, None)`
pub fn split_key(key: &str) -> (&str, Option<&str>) {
    match key.split_once(SEPARATOR) {
        Some((head, rest)) => (head, Some(rest)),
        None => (key, None),
    }
}

/// Outcome of routing a flat parameter map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutedParams {
    /// Plain keys that are known top-level parameters
    pub top: Params,
    /// Residual params grouped by component prefix
    pub by_prefix: BTreeMap<String, Params>,
    /// Keys that matched neither, in input order
    pub unknown: Vec<String>,
}

impl RoutedParams {
    /// Residual params for a prefix (empty if none were given)
    pub fn component(&self, prefix: &str) -> Params {
        self.by_prefix.get(prefix).cloned().unwrap_or_default()
    }
}

/// Partition `params` into known top-level keys, per-prefix residuals and
/// unknown keys
///
/// A compound key is routable only if its head is one of `prefixes`; a plain
/// key is accepted if it is in `known_top`.
pub fn route(params: &Params, known_top: &[&str], prefixes: &[&str]) -> RoutedParams {
    let mut routed = RoutedParams::default();
    for (key, value) in params.iter() {
        match split_key(key) {
            (head, Some(rest)) if prefixes.contains(&head) => {
                routed
                    .by_prefix
                    .entry(head.to_string())
                    .or_default()
                    .insert(rest, value.clone());
            }
            (head, None) if known_top.contains(&head) => {
                routed.top.insert(head, value.clone());
            }
            _ => routed.unknown.push(key.to_string()),
        }
    }
    routed
}
