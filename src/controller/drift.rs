//! Drift detection between a live managed object and its expected form
//!
//! Both objects are compared as JSON with `metadata` and `status` removed.
//! Fields that only exist on the live object are server-side defaults and do
//! not count as drift; every field the controller sets must be present with
//! the same value. The expected body is also recorded in an annotation at
//! write time, so a field the controller stops setting is still noticed.

use serde_json::{Map, Value};

use super::kind::ManagedObject;
use crate::error::Result;

/// Annotation holding the body last written by the controller
pub const LAST_APPLIED_ANNOTATION: &str = "simpleoperator.szikes.io/last-applied";

const IGNORED_FIELDS: [&str; 2] = ["metadata", "status"];

/// The comparable body of an object: everything except metadata and status
pub fn comparable_body(object: &ManagedObject) -> Result<Value> {
    let mut value = object.to_value()?;
    if let Value::Object(map) = &mut value {
        for field in IGNORED_FIELDS {
            map.remove(field);
        }
    }
    Ok(value)
}

/// Whether `current` differs from `expected` in any field the controller owns
pub fn has_drift(current: &ManagedObject, expected: &ManagedObject) -> Result<bool> {
    let desired = comparable_body(expected)?;
    let live = comparable_body(current)?;

    if !covers(&live, &desired) {
        return Ok(true);
    }

    let last_applied = current
        .metadata()
        .annotations
        .as_ref()
        .and_then(|a| a.get(LAST_APPLIED_ANNOTATION));

    match last_applied {
        // Unparseable bookkeeping is treated as drift so the next update rewrites it
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(previous) => Ok(previous != desired),
            Err(_) => Ok(true),
        },
        None => Ok(false),
    }
}

/// Record the object's own body in its last-applied annotation
pub fn set_last_applied(object: &mut ManagedObject) -> Result<()> {
    let body = serde_json::to_string(&comparable_body(object)?)?;
    object
        .metadata_mut()
        .annotations
        .get_or_insert_with(Default::default)
        .insert(LAST_APPLIED_ANNOTATION.to_string(), body);
    Ok(())
}

/// True when every field of `expected` appears in `live` with an equal value.
/// Arrays must match in length and element by element.
fn covers(live: &Value, expected: &Value) -> bool {
    match (live, expected) {
        (Value::Object(live), Value::Object(expected)) => covers_map(live, expected),
        (Value::Array(live), Value::Array(expected)) => {
            live.len() == expected.len()
                && live.iter().zip(expected).all(|(l, e)| covers(l, e))
        }
        (live, expected) => live == expected,
    }
}

fn covers_map(live: &Map<String, Value>, expected: &Map<String, Value>) -> bool {
    expected.iter().all(|(key, want)| match live.get(key) {
        Some(have) => covers(have, want),
        None => want.is_null(),
    })
}
