//! Lenient timestamp handling for gateway payloads.
//!
//! The gateway emits date-times as ISO strings (with or without an offset),
//! as `[y, m, d, h, mi, s, nanos]` arrays, or as epoch milliseconds,
//! depending on the column type behind the endpoint.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTime {
    Text(String),
    Millis(i64),
    Parts(Vec<i64>),
}

pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

fn from_parts(parts: &[i64]) -> Option<NaiveDateTime> {
    let get = |i: usize| parts.get(i).copied().unwrap_or(0);
    if parts.len() < 3 {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(get(0) as i32, get(1) as u32, get(2) as u32)?;
    let time = NaiveTime::from_hms_nano_opt(get(3) as u32, get(4) as u32, get(5) as u32, get(6) as u32)?;
    Some(date.and_time(time))
}

fn from_millis(ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

fn resolve(raw: RawTime) -> Option<NaiveDateTime> {
    match raw {
        RawTime::Text(s) => parse_datetime(&s),
        RawTime::Millis(ms) => from_millis(ms),
        RawTime::Parts(parts) => from_parts(&parts),
    }
}

/// `#[serde(with = "datetime")]` for required date-time fields.
pub mod datetime {
    use super::*;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.format(WIRE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = RawTime::deserialize(d)?;
        resolve(raw).ok_or_else(|| D::Error::custom("unrecognised timestamp"))
    }
}

/// Optional date-times; unparseable values become `None` rather than failing the payload.
pub mod option_datetime {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<NaiveDateTime>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => s.serialize_str(&v.format(WIRE_FORMAT).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw = Option::<RawTime>::deserialize(d)?;
        Ok(raw.and_then(resolve))
    }
}

/// Calendar dates; a full date-time is truncated to its date.
pub mod date {
    use super::*;

    pub fn serialize<S: Serializer>(value: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = RawTime::deserialize(d)?;
        resolve(raw)
            .map(|dt| dt.date())
            .ok_or_else(|| D::Error::custom("unrecognised date"))
    }
}
