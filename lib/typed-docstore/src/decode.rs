//! Path-aware decoding of raw documents into domain types, and the inverse
//! encoding used on the write path.
//!
//! - [`FromValue`]: decode a `Value` at a path, accumulating every failure
//! - [`ToValue`]: infallible encoding (the static type is trusted on writes)
//! - [`Decoder`]: the per-collection validator seam

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::marker::PhantomData;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;

use crate::{StorageDatetime, Timestamp, Value};

/// One failing path in a decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeIssue {
    /// Dotted path to the value, `items[2].name` style. Empty for the root.
    pub path: String,
    pub expected: String,
    pub found: String,
}

impl fmt::Display for DecodeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() {
            "(root)"
        } else {
            self.path.as_str()
        };
        write!(
            f,
            "Invalid value {} supplied to {}: expected {}",
            self.found, path, self.expected
        )
    }
}

/// Every validation failure found while decoding one value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeReport {
    issues: Vec<DecodeIssue>,
}

impl DecodeReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A report with exactly one issue.
    pub fn single(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        let mut report = Self::new();
        report.push(path, expected, found);
        report
    }

    /// Shorthand for a type mismatch against `value`.
    pub fn mismatch(path: &str, expected: &str, value: &Value) -> Self {
        Self::single(path, expected, value.describe())
    }

    pub fn push(
        &mut self,
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) {
        self.issues.push(DecodeIssue {
            path: path.into(),
            expected: expected.into(),
            found: found.into(),
        });
    }

    pub fn merge(&mut self, other: DecodeReport) {
        self.issues.extend(other.issues);
    }

    /// Record the failure of `result`, if any, and hand back the success value.
    pub fn capture<T>(&mut self, result: Result<T, DecodeReport>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(report) => {
                self.merge(report);
                None
            }
        }
    }

    pub fn issues(&self) -> &[DecodeIssue] {
        &self.issues
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }
}

impl fmt::Display for DecodeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.issues.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", rendered.join(","))
    }
}

impl std::error::Error for DecodeReport {}

/// Path of a map entry below `parent`.
pub fn field_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// Path of an array element below `parent`.
pub fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

/// Types that can be decoded from a raw document value.
pub trait FromValue: Sized {
    /// Human-readable name of what this type accepts.
    const EXPECTED: &'static str;

    fn from_value(value: &Value, path: &str) -> Result<Self, DecodeReport>;

    /// Called when a map field is absent. Required by default.
    fn from_missing(path: &str) -> Result<Self, DecodeReport> {
        Err(DecodeReport::single(path, Self::EXPECTED, "undefined"))
    }
}

/// Decode `key` out of `map`, treating absence via [`FromValue::from_missing`].
pub fn decode_field<T: FromValue>(
    map: &crate::Map,
    key: &str,
    parent: &str,
) -> Result<T, DecodeReport> {
    let path = field_path(parent, key);
    match map.get(key) {
        Some(value) => T::from_value(value, &path),
        None => T::from_missing(&path),
    }
}

/// Types that can be written into a document.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

impl FromValue for Value {
    const EXPECTED: &'static str = "any value";

    fn from_value(value: &Value, _path: &str) -> Result<Self, DecodeReport> {
        Ok(value.clone())
    }

    fn from_missing(_path: &str) -> Result<Self, DecodeReport> {
        Ok(Value::Null)
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_value(value: &Value, path: &str) -> Result<Self, DecodeReport> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(DecodeReport::mismatch(path, Self::EXPECTED, other)),
        }
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

/// Integral view of a numeric value. Doubles qualify only without a fraction.
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(n) => Some(*n),
        Value::Double(d) if d.is_finite() && d.fract() == 0.0 => {
            if *d >= i64::MIN as f64 && *d <= i64::MAX as f64 {
                Some(*d as i64)
            } else {
                None
            }
        }
        _ => None,
    }
}

// Only types that convert losslessly into `i64` get impls, so every typed
// write stays readable by the same decoder.
macro_rules! integer_value {
    ($($ty:ty => $expected:literal),* $(,)?) => {
        $(
            impl FromValue for $ty {
                const EXPECTED: &'static str = $expected;

                fn from_value(value: &Value, path: &str) -> Result<Self, DecodeReport> {
                    as_integer(value)
                        .and_then(|n| <$ty>::try_from(n).ok())
                        .ok_or_else(|| DecodeReport::mismatch(path, Self::EXPECTED, value))
                }
            }

            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::Integer(i64::from(*self))
                }
            }
        )*
    };
}

integer_value! {
    i64 => "integer",
    i32 => "32-bit integer",
    u32 => "unsigned 32-bit integer",
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "number";

    fn from_value(value: &Value, path: &str) -> Result<Self, DecodeReport> {
        match value {
            Value::Double(d) => Ok(*d),
            Value::Integer(n) => Ok(*n as f64),
            other => Err(DecodeReport::mismatch(path, Self::EXPECTED, other)),
        }
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Double(*self)
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: &Value, path: &str) -> Result<Self, DecodeReport> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(DecodeReport::mismatch(path, Self::EXPECTED, other)),
        }
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ToValue for &str {
    fn to_value(&self) -> Value {
        Value::String((*self).to_string())
    }
}

impl FromValue for StorageDatetime {
    const EXPECTED: &'static str = "timestamp";

    fn from_value(value: &Value, path: &str) -> Result<Self, DecodeReport> {
        match value {
            Value::Instant(dt) => Ok(*dt),
            Value::Timestamp(ts) => ts
                .to_datetime()
                .ok_or_else(|| DecodeReport::mismatch(path, "timestamp in range", value)),
            other => Err(DecodeReport::mismatch(path, Self::EXPECTED, other)),
        }
    }
}

impl ToValue for StorageDatetime {
    fn to_value(&self) -> Value {
        Value::Instant(*self)
    }
}

impl FromValue for Timestamp {
    const EXPECTED: &'static str = "timestamp";

    fn from_value(value: &Value, path: &str) -> Result<Self, DecodeReport> {
        match value {
            Value::Timestamp(ts) => Ok(*ts),
            Value::Instant(dt) => Ok(Timestamp::from(*dt)),
            other => Err(DecodeReport::mismatch(path, Self::EXPECTED, other)),
        }
    }
}

impl ToValue for Timestamp {
    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value(value: &Value, path: &str) -> Result<Self, DecodeReport> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other, path).map(Some),
        }
    }

    fn from_missing(_path: &str) -> Result<Self, DecodeReport> {
        Ok(None)
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    const EXPECTED: &'static str = "array";

    fn from_value(value: &Value, path: &str) -> Result<Self, DecodeReport> {
        let Value::Array(items) = value else {
            return Err(DecodeReport::mismatch(path, Self::EXPECTED, value));
        };

        let mut report = DecodeReport::new();
        let decoded: Vec<Option<T>> = items
            .iter()
            .enumerate()
            .map(|(i, item)| report.capture(T::from_value(item, &index_path(path, i))))
            .collect();

        if !report.is_empty() {
            return Err(report);
        }
        Ok(decoded.into_iter().flatten().collect())
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(ToValue::to_value).collect())
    }
}

/// Decode every entry of a map value, accumulating failures.
fn decode_entries<T: FromValue>(
    value: &Value,
    path: &str,
) -> Result<Vec<(String, T)>, DecodeReport> {
    let Value::Map(map) = value else {
        return Err(DecodeReport::mismatch(path, "map", value));
    };

    let mut report = DecodeReport::new();
    let mut entries = Vec::with_capacity(map.len());
    for (key, item) in map {
        if let Some(decoded) = report.capture(T::from_value(item, &field_path(path, key))) {
            entries.push((key.clone(), decoded));
        }
    }

    if report.is_empty() {
        Ok(entries)
    } else {
        Err(report)
    }
}

impl<T: FromValue> FromValue for IndexMap<String, T> {
    const EXPECTED: &'static str = "map";

    fn from_value(value: &Value, path: &str) -> Result<Self, DecodeReport> {
        decode_entries(value, path).map(|entries| entries.into_iter().collect())
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    const EXPECTED: &'static str = "map";

    fn from_value(value: &Value, path: &str) -> Result<Self, DecodeReport> {
        decode_entries(value, path).map(|entries| entries.into_iter().collect())
    }
}

impl<T: FromValue> FromValue for HashMap<String, T> {
    const EXPECTED: &'static str = "map";

    fn from_value(value: &Value, path: &str) -> Result<Self, DecodeReport> {
        decode_entries(value, path).map(|entries| entries.into_iter().collect())
    }
}

impl<T: ToValue> ToValue for IndexMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }
}

impl<T: ToValue> ToValue for BTreeMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }
}

// Keys are sorted so the stored document does not depend on hash order.
impl<T: ToValue> ToValue for HashMap<String, T> {
    fn to_value(&self) -> Value {
        let mut entries: Vec<(&String, &T)> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }
}

/// A validator for one collection's documents.
///
/// Decoders are pure: they never mutate the raw value.
pub trait Decoder<V>: Send + Sync {
    fn decode(&self, raw: &Value) -> Result<V, DecodeReport>;
}

impl<V, F> Decoder<V> for F
where
    F: Fn(&Value) -> Result<V, DecodeReport> + Send + Sync,
{
    fn decode(&self, raw: &Value) -> Result<V, DecodeReport> {
        self(raw)
    }
}

/// Decoder backed by the type's own [`FromValue`] impl.
pub struct Derived<V>(PhantomData<fn() -> V>);

impl<V> Default for Derived<V> {
    fn default() -> Self {
        Derived(PhantomData)
    }
}

impl<V> Clone for Derived<V> {
    fn clone(&self) -> Self {
        Derived(PhantomData)
    }
}

impl<V: FromValue> Decoder<V> for Derived<V> {
    fn decode(&self, raw: &Value) -> Result<V, DecodeReport> {
        V::from_value(raw, "")
    }
}

/// Shorthand for `Derived::<V>::default()`.
pub fn derived<V: FromValue>() -> Derived<V> {
    Derived::default()
}

/// Decoder backed by `serde` deserialization.
///
/// Timestamps reach serde as RFC3339 strings. serde stops at the first
/// failure, so reports from this decoder carry a single issue.
pub struct SerdeDecoder<V>(PhantomData<fn() -> V>);

impl<V> Default for SerdeDecoder<V> {
    fn default() -> Self {
        SerdeDecoder(PhantomData)
    }
}

impl<V: DeserializeOwned> Decoder<V> for SerdeDecoder<V> {
    fn decode(&self, raw: &Value) -> Result<V, DecodeReport> {
        serde_json::from_value(serde_json::Value::from(raw)).map_err(|e| {
            DecodeReport::single("", std::any::type_name::<V>(), e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Map;
    use serde::Deserialize;

    fn doc(entries: Vec<(&str, Value)>) -> Value {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<Map>(),
        )
    }

    #[test]
    fn integers_accept_integral_doubles_only() {
        assert_eq!(i64::from_value(&Value::Double(3.0), "n").unwrap(), 3);
        let err = i64::from_value(&Value::Double(3.5), "n").unwrap_err();
        assert_eq!(err.issues()[0].path, "n");
        assert_eq!(err.issues()[0].expected, "integer");
        assert!(u32::from_value(&Value::Integer(-1), "n").is_err());
    }

    #[test]
    fn integer_writes_read_back_at_the_extremes() {
        for n in [i64::MIN, -1, i64::MAX] {
            assert_eq!(i64::from_value(&n.to_value(), "n").unwrap(), n);
        }
        assert_eq!(u32::MAX.to_value(), Value::Integer(4_294_967_295));
        assert_eq!(u32::from_value(&u32::MAX.to_value(), "n").unwrap(), u32::MAX);
        assert_eq!(i32::from_value(&i32::MIN.to_value(), "n").unwrap(), i32::MIN);
        assert!(u32::from_value(&Value::Integer(i64::from(u32::MAX) + 1), "n").is_err());
    }

    #[test]
    fn hash_maps_encode_with_sorted_keys() {
        let counts: HashMap<String, i64> = [("b", 2), ("a", 1), ("c", 3)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let value = counts.to_value();
        let keys: Vec<&str> = value.as_map().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(HashMap::<String, i64>::from_value(&value, "counts").unwrap(), counts);
    }

    #[test]
    fn floats_accept_integers() {
        assert_eq!(f64::from_value(&Value::Integer(5), "x").unwrap(), 5.0);
        assert!(f64::from_value(&Value::from("5"), "x").is_err());
    }

    #[test]
    fn option_accepts_missing_and_null() {
        let map = Map::new();
        let decoded: Option<String> = decode_field(&map, "nick", "").unwrap();
        assert_eq!(decoded, None);
        assert_eq!(Option::<i64>::from_value(&Value::Null, "n").unwrap(), None);
        assert!(decode_field::<String>(&map, "nick", "").is_err());
    }

    #[test]
    fn vec_reports_every_bad_element() {
        let raw = Value::Array(vec![Value::Integer(1), Value::from("a"), Value::Bool(true)]);
        let report = Vec::<i64>::from_value(&raw, "scores").unwrap_err();
        let paths: Vec<&str> = report.issues().iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["scores[1]", "scores[2]"]);
    }

    #[test]
    fn nested_map_paths_are_dotted() {
        let raw = doc(vec![("a", Value::Integer(1)), ("b", Value::Null)]);
        let report = BTreeMap::<String, i64>::from_value(&raw, "counts").unwrap_err();
        assert_eq!(report.len(), 1);
        assert_eq!(report.issues()[0].path, "counts.b");
        assert_eq!(report.issues()[0].found, "null");
    }

    #[test]
    fn datetime_accepts_both_temporal_forms() {
        let dt = StorageDatetime::from_millis(1_234).unwrap();
        let from_ts =
            StorageDatetime::from_value(&Value::Timestamp(Timestamp::from_millis(1_234)), "t")
                .unwrap();
        assert_eq!(from_ts, dt);
        assert_eq!(StorageDatetime::from_value(&Value::Instant(dt), "t").unwrap(), dt);
    }

    #[test]
    fn stored_timestamps_beyond_millis_range_decode_without_overflow() {
        let raw = Value::Timestamp(Timestamp::new(i64::MAX / 10, 0));
        let ts = Timestamp::from_value(&raw, "t").unwrap();
        assert_eq!(ts.to_millis(), i64::MAX);
        assert!(StorageDatetime::from_value(&raw, "t").is_err());
    }

    #[test]
    fn report_display_lists_all_issues() {
        let mut report = DecodeReport::new();
        report.push("x", "number", "\"not a number\"");
        report.push("", "map", "null");
        assert_eq!(
            report.to_string(),
            "Invalid value \"not a number\" supplied to x: expected number,\
             Invalid value null supplied to (root): expected map"
        );
    }

    #[test]
    fn closures_are_decoders() {
        let decoder = |raw: &Value| decode_field::<f64>(raw.as_map().unwrap(), "x", "");
        assert_eq!(decoder.decode(&doc(vec![("x", Value::Integer(5))])).unwrap(), 5.0);
        assert!(decoder.decode(&doc(vec![("x", Value::from("no"))])).is_err());
    }

    #[test]
    fn serde_decoder_reads_timestamps_as_datetimes() {
        #[derive(Debug, Deserialize)]
        struct Play {
            at: StorageDatetime,
            n: u32,
        }

        let raw = doc(vec![
            ("at", Value::Timestamp(Timestamp::from_millis(2_000))),
            ("n", Value::Integer(4)),
        ]);
        let play = SerdeDecoder::<Play>::default().decode(&raw).unwrap();
        assert_eq!(play.at.to_millis(), 2_000);
        assert_eq!(play.n, 4);

        let bad = doc(vec![("at", Value::Null), ("n", Value::Integer(4))]);
        let report = SerdeDecoder::<Play>::default().decode(&bad).unwrap_err();
        assert_eq!(report.len(), 1);
    }
}
