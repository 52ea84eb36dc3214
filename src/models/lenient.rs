//! Tolerant decoders for fields that older form revisions stored loosely
//! (numbers as strings, `""` for "not set", full timestamps for dates,
//! plain dates for timestamps, `null` for empty lists).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::de::Error;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

pub fn number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let value = match Option::<RawNumber>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(RawNumber::Int(n)) => n,
        Some(RawNumber::Float(f)) => f.round() as i64,
        Some(RawNumber::Text(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<f64>()
                .map_err(|e| D::Error::custom(format!("invalid number '{}': {}", s, e)))?
                .round() as i64
        }
    };

    T::try_from(value)
        .map(Some)
        .map_err(|_| D::Error::custom(format!("number {} out of range", value)))
}

/// Treats `null` as the type's default.
pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.trim().is_empty()))
}

pub fn date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = text(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Some(date));
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| Some(dt.date_naive()))
        .map_err(|e| D::Error::custom(format!("invalid date '{}': {}", raw, e)))
}

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates, the latter as
/// midnight UTC.
pub fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = text(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| Some(date.and_time(NaiveTime::MIN).and_utc()))
        .map_err(|e| D::Error::custom(format!("invalid timestamp '{}': {}", raw, e)))
}
