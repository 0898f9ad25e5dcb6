use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// Two temporal types cross the store boundary:
//
// - `StorageDatetime` is the domain-native instant application code works with.
// - `Timestamp` is the store-native representation (seconds + nanos) that
//   documents carry once written.
//
// Writes rewrite the former into the latter; see `normalize`.

/// Domain-native instant with microsecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorageDatetime(pub DateTime<Utc>);

// Custom serde to always use microsecond precision with Z timezone
impl Serialize for StorageDatetime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for StorageDatetime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| StorageDatetime(dt.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom)
    }
}

impl StorageDatetime {
    pub fn now() -> Self {
        StorageDatetime(datetime_micros())
    }

    /// Build an instant from milliseconds since the Unix epoch.
    ///
    /// Returns `None` when the value is outside chrono's representable range.
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(StorageDatetime)
    }

    /// Milliseconds since the Unix epoch (sub-millisecond precision is dropped).
    pub fn to_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    pub fn inner(&self) -> &DateTime<Utc> {
        &self.0
    }

    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
    }
}

impl std::fmt::Display for StorageDatetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%S%.6fZ"))
    }
}

impl From<DateTime<Utc>> for StorageDatetime {
    fn from(dt: DateTime<Utc>) -> Self {
        StorageDatetime(dt)
    }
}

impl From<StorageDatetime> for DateTime<Utc> {
    fn from(dt: StorageDatetime) -> Self {
        dt.0
    }
}

/// Store-native timestamp.
///
/// `nanos` is always in `0..1_000_000_000`; instants before the epoch carry a
/// negative `seconds` and a positive `nanos` offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    pub fn from_millis(millis: i64) -> Self {
        Self {
            seconds: millis.div_euclid(1_000),
            nanos: (millis.rem_euclid(1_000) * 1_000_000) as i32,
        }
    }

    /// Milliseconds since the Unix epoch, saturating at the `i64` bounds.
    pub fn to_millis(&self) -> i64 {
        self.seconds
            .saturating_mul(1_000)
            .saturating_add(i64::from(self.nanos / 1_000_000))
    }

    pub fn to_datetime(&self) -> Option<StorageDatetime> {
        DateTime::from_timestamp(self.seconds, self.nanos as u32).map(StorageDatetime)
    }
}

impl From<StorageDatetime> for Timestamp {
    fn from(dt: StorageDatetime) -> Self {
        Timestamp::from_millis(dt.to_millis())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt),
            None => write!(f, "Timestamp(seconds={}, nanos={})", self.seconds, self.nanos),
        }
    }
}

/// Create a DateTime truncated to microsecond precision (6 decimal places)
fn datetime_micros() -> DateTime<Utc> {
    let now = match std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
        Ok(time) => time,
        Err(_) => std::time::Duration::from_secs(0),
    };

    let timestamp_micros = (now.as_secs() as i64 * 1_000_000) + (now.subsec_micros() as i64);
    if let Some(time) = DateTime::from_timestamp_micros(timestamp_micros) {
        time
    } else {
        DateTime::<Utc>::from_timestamp_nanos(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_millis_roundtrip_positive() {
        let ts = Timestamp::from_millis(1_700_000_000_123);
        assert_eq!(ts.seconds, 1_700_000_000);
        assert_eq!(ts.nanos, 123_000_000);
        assert_eq!(ts.to_millis(), 1_700_000_000_123);
    }

    #[test]
    fn timestamp_millis_before_epoch() {
        let ts = Timestamp::from_millis(-1);
        assert_eq!(ts.seconds, -1);
        assert_eq!(ts.nanos, 999_000_000);
        assert_eq!(ts.to_millis(), -1);
    }

    #[test]
    fn timestamp_millis_saturate_out_of_range() {
        assert_eq!(Timestamp::new(i64::MAX / 10, 0).to_millis(), i64::MAX);
        assert_eq!(Timestamp::new(i64::MAX, 999_000_000).to_millis(), i64::MAX);
        assert_eq!(Timestamp::new(i64::MIN / 10, 0).to_millis(), i64::MIN);
        assert_eq!(Timestamp::new(i64::MAX / 10, 0).to_datetime(), None);
    }

    #[test]
    fn datetime_converts_to_timestamp() {
        let dt = StorageDatetime::from_millis(86_400_500).unwrap();
        let ts = Timestamp::from(dt);
        assert_eq!(ts, Timestamp::new(86_400, 500_000_000));
        assert_eq!(ts.to_datetime().unwrap(), dt);
    }

    #[test]
    fn now_has_microsecond_precision() {
        let now = StorageDatetime::now();
        assert_eq!(now.inner().timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn serde_uses_rfc3339_micros() {
        let dt = StorageDatetime::from_millis(0).unwrap();
        let json = serde_json::to_string(&dt).unwrap();
        assert_eq!(json, "\"1970-01-01T00:00:00.000000Z\"");
        let back: StorageDatetime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dt);
    }
}
