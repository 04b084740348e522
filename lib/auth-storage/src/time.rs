use std::ops::Add;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// UTC timestamp with microsecond precision.
///
/// PostgreSQL stores timestamps with microsecond resolution, so values are
/// truncated on creation. A value read back from the database compares equal
/// to the one that was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorageDatetime(DateTime<Utc>);

// Always microsecond precision with Z timezone
impl Serialize for StorageDatetime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_rfc3339_opts(chrono::SecondsFormat::Micros, true))
    }
}

impl<'de> Deserialize<'de> for StorageDatetime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| StorageDatetime::from(dt.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom)
    }
}

impl StorageDatetime {
    pub fn now() -> Self {
        StorageDatetime(datetime_micros())
    }

    /// The "never" timestamp, 0001-01-01T00:00:00Z.
    ///
    /// Used as the last-login value of users that have not logged in yet.
    pub fn zero() -> Self {
        let zero = NaiveDate::from_ymd_opt(1, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        StorageDatetime(zero)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    pub fn inner(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl Default for StorageDatetime {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add<Duration> for StorageDatetime {
    type Output = StorageDatetime;

    fn add(self, rhs: Duration) -> Self::Output {
        let delta = chrono::Duration::from_std(rhs).unwrap_or(chrono::Duration::zero());
        StorageDatetime::from(self.0 + delta)
    }
}

impl std::fmt::Display for StorageDatetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%S%.6fZ"))
    }
}

impl From<DateTime<Utc>> for StorageDatetime {
    fn from(dt: DateTime<Utc>) -> Self {
        StorageDatetime(truncate_micros(dt))
    }
}

impl From<StorageDatetime> for DateTime<Utc> {
    fn from(dt: StorageDatetime) -> Self {
        dt.0
    }
}

fn truncate_micros(dt: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(dt.timestamp_micros()).unwrap_or(dt)
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
