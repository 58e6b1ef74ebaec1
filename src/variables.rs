//! The variable model and the merge algorithm shared by trees, features
//! and playbooks.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};

/// An ordered mapping from namespace to value. Values may themselves be
/// nested mappings, sequences or scalars. Insertion order matters only for
/// reproducible merge output, not semantics.
pub type Variables = IndexMap<String, Value>;

/// Merges `incoming` over `base`, recursing over mapping depth.
///
/// For each key present in either input:
/// * only one side defines it: that value is kept;
/// * both sides define it and the base value is a mapping: recurse;
/// * both sides define it and the base value is a sequence: base followed
///   by incoming, order preserved, duplicates allowed;
/// * otherwise the incoming value replaces the base value.
///
/// With `left_join` the incoming keys at the top two levels must already
/// exist in `base`; an absent key raises [`Error::UndeclaredVariables`].
/// Below that, merges are always permissive. A feature may only refine
/// variables inside namespaces that already exist, never introduce new
/// ones through a dependency override.
///
/// Result key order is base keys first in original order, then
/// incoming-only keys in their original order, so repeated application is
/// reproducible.
pub fn merge_variables(
    base: &Variables,
    incoming: &Variables,
    left_join: bool,
) -> Result<Variables> {
    if left_join {
        let extra: Vec<String> = incoming
            .keys()
            .filter(|key| !base.contains_key(*key))
            .cloned()
            .collect();
        if !extra.is_empty() {
            return Err(Error::UndeclaredVariables { keys: extra });
        }
    }

    let mut result = Variables::new();
    for (key, base_value) in base {
        let merged = match incoming.get(key) {
            Some(incoming_value) => merge_value(base_value, incoming_value, 1, left_join)?,
            None => base_value.clone(),
        };
        result.insert(key.clone(), merged);
    }
    for (key, incoming_value) in incoming {
        if !base.contains_key(key) {
            result.insert(key.clone(), incoming_value.clone());
        }
    }
    Ok(result)
}

fn merge_value(base: &Value, incoming: &Value, depth: usize, left_join: bool) -> Result<Value> {
    match (base, incoming) {
        (Value::Mapping(base_map), Value::Mapping(incoming_map)) => Ok(Value::Mapping(
            merge_mapping(base_map, incoming_map, depth, left_join)?,
        )),
        (Value::Sequence(base_seq), Value::Sequence(incoming_seq)) => {
            let mut merged = base_seq.clone();
            merged.extend(incoming_seq.iter().cloned());
            Ok(Value::Sequence(merged))
        }
        _ => Ok(incoming.clone()),
    }
}

fn merge_mapping(
    base: &Mapping,
    incoming: &Mapping,
    depth: usize,
    left_join: bool,
) -> Result<Mapping> {
    // Strictness only applies to the top two levels; leaf-level mappings
    // merge permissively even when the top-level merge is strict.
    if left_join && depth < 2 {
        let extra: Vec<String> = incoming
            .iter()
            .filter(|(key, _)| !base.contains_key(*key))
            .map(|(key, _)| key_name(key))
            .collect();
        if !extra.is_empty() {
            return Err(Error::UndeclaredVariables { keys: extra });
        }
    }

    let mut result = Mapping::new();
    for (key, base_value) in base {
        let merged = match incoming.get(key) {
            Some(incoming_value) => merge_value(base_value, incoming_value, depth + 1, left_join)?,
            None => base_value.clone(),
        };
        result.insert(key.clone(), merged);
    }
    for (key, incoming_value) in incoming {
        if !base.contains_key(key) {
            result.insert(key.clone(), incoming_value.clone());
        }
    }
    Ok(result)
}

fn key_name(key: &Value) -> String {
    match key {
        Value::String(name) => name.clone(),
        other => format!("{:?}", other),
    }
}
