//! Rewrites domain-native instants into store-native timestamps.
//!
//! Every write passes through [`normalize`]. The traversal is a deep clone over
//! the tagged `Value` tree: scalars, arrays and maps are copied as-is (map key
//! order included) and any scalar the predicate recognises as an instant is
//! replaced by `Value::Timestamp` built from the same millisecond count.
//!
//! Documents are trees; cyclic input cannot be expressed in `Value`.

use crate::{Timestamp, Value};

/// Deep-clone `value`, replacing every domain-native instant with the
/// equivalent store-native timestamp.
///
/// Idempotent: store-native timestamps are never matched by the predicate, so
/// normalizing an already-normalized value returns an equal value.
pub fn normalize(value: &Value) -> Value {
    normalize_with(value, &Value::instant_millis)
}

/// Same traversal as [`normalize`] with a caller-supplied predicate.
///
/// `instant_millis` returns the epoch milliseconds for values that must be
/// rewritten and `None` for everything else. It must not match
/// `Value::Timestamp`, or normalization stops being idempotent.
pub fn normalize_with<F>(value: &Value, instant_millis: &F) -> Value
where
    F: Fn(&Value) -> Option<i64>,
{
    if let Some(millis) = instant_millis(value) {
        return Value::Timestamp(Timestamp::from_millis(millis));
    }

    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| normalize_with(item, instant_millis))
                .collect(),
        ),
        Value::Map(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), normalize_with(v, instant_millis)))
                .collect(),
        ),
        other => other.clone(),
    }
}
