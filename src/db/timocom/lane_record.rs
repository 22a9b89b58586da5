use std::collections::BTreeMap;

use jiff::civil::{Date, DateTime};
use jiff::fmt::strtime;
use jiff::tz::TimeZone;
use jiff::Timestamp;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RecordError {
    #[error("lane {lane}: can't parse timestamp {value:?}")]
    Timestamp { lane: String, value: String },
    #[error("lane {lane}: history bucket {key:?} is not a year")]
    Bucket { lane: String, key: String },
    #[error("lane {lane}: expected a number, got {value}")]
    Value { lane: String, value: String },
}

/// One API response for a lane, as stored in the dump file.
///
/// The `DATAHISTORY` keys are 2-digit years, each holding one value per
/// calendar month.
#[derive(Debug, Clone, Deserialize)]
pub struct LaneRecord {
    #[serde(rename = "FROM")]
    pub from: String,
    #[serde(rename = "TO")]
    pub to: String,
    #[serde(rename = "LASTUPDATE")]
    pub last_update: String,
    #[serde(rename = "DATANOW")]
    pub data_now: Value,
    #[serde(rename = "DATAHISTORY")]
    pub data_history: BTreeMap<String, Vec<Value>>,
}

impl LaneRecord {
    pub fn lane(&self) -> String {
        format!("{}->{}", self.from, self.to)
    }

    /// Calendar date of the last update.
    pub fn update_date(&self) -> Result<Date, RecordError> {
        parse_update_date(&self.last_update).ok_or_else(|| RecordError::Timestamp {
            lane: self.lane(),
            value: self.last_update.clone(),
        })
    }

    /// Year of a history bucket, e.g. "23" -> 2023.
    pub fn bucket_year(&self, key: &str) -> Result<i32, RecordError> {
        format!("20{}", key.trim())
            .parse::<i32>()
            .map_err(|_| RecordError::Bucket {
                lane: self.lane(),
                key: key.to_string(),
            })
    }

    pub fn number(&self, value: &Value) -> Result<Option<f64>, RecordError> {
        let err = || RecordError::Value {
            lane: self.lane(),
            value: value.to_string(),
        };
        match value {
            Value::Null => Ok(None),
            Value::Number(x) => x.as_f64().map(Some).ok_or_else(err),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => s.trim().parse::<f64>().map(Some).map_err(|_| err()),
            _ => Err(err()),
        }
    }
}

const UPDATE_FORMATS: [&str; 12] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%B, %d %Y %H:%M:%S",
    "%B %d, %Y %H:%M:%S",
    "%b %d, %Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y",
];

/// Parse the `LASTUPDATE` field.  The API has used ISO timestamps and the
/// ColdFusion date serialization (`October, 05 2023 10:15:00`).  Slashed
/// dates are month first.  A timestamp with an offset keeps its local day.
pub fn parse_update_date(s: &str) -> Option<Date> {
    let s = s.trim();
    if let Ok(dt) = s.parse::<DateTime>() {
        return Some(dt.date());
    }
    if let Ok(date) = s.parse::<Date>() {
        return Some(date);
    }
    if let Some(date) = UPDATE_FORMATS
        .iter()
        .find_map(|fmt| strtime::parse(fmt, s).ok().and_then(|tm| tm.to_date().ok()))
    {
        return Some(date);
    }
    s.parse::<Timestamp>()
        .ok()
        .map(|ts| ts.to_zoned(TimeZone::UTC).date())
}

/// One row of either output table.  Monthly history rows have no `day`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub updated_at: String,
    #[serde(deserialize_with = "de_whole")]
    pub year: i32,
    #[serde(deserialize_with = "de_whole")]
    pub month: u32,
    #[serde(deserialize_with = "de_opt_whole")]
    pub day: Option<u32>,
    pub from: String,
    pub to: String,
    pub value: Option<f64>,
}

pub const COLUMNS: [&str; 7] = ["updated_at", "year", "month", "day", "from", "to", "value"];

/// Accept both `2023` and `2023.0`, files written by other tools carry
/// integer columns as floats.
fn parse_whole(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(x) = s.parse::<i64>() {
        return Some(x);
    }
    match s.parse::<f64>() {
        Ok(x) if x.fract() == 0.0 && x.is_finite() => Some(x as i64),
        _ => None,
    }
}

fn de_whole<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let s = String::deserialize(deserializer)?;
    parse_whole(&s)
        .and_then(|x| T::try_from(x).ok())
        .ok_or_else(|| serde::de::Error::custom(format!("invalid integer {:?}", s)))
}

fn de_opt_whole<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() || s.trim().eq_ignore_ascii_case("nan") => Ok(None),
        Some(s) => parse_whole(&s)
            .and_then(|x| T::try_from(x).ok())
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid integer {:?}", s))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    UpdatedAt,
    Year,
    Month,
    Day,
    From,
    To,
    Value,
}

/// Columns identifying a row across downloads.
pub const IDENTIFIERS: [Column; 5] = [
    Column::Year,
    Column::Month,
    Column::Day,
    Column::From,
    Column::To,
];

/// A single cell of an identity key.  Numbers compare by value, so an
/// integer 5 matches a float 5.0, and a missing cell matches another
/// missing cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Null,
    Number(u64),
    Text(String),
}

impl KeyPart {
    fn number(x: f64) -> KeyPart {
        if x.is_nan() {
            return KeyPart::Null;
        }
        // -0.0 and 0.0 are the same key
        KeyPart::Number((x + 0.0).to_bits())
    }
}

impl Row {
    pub fn key(&self, identifiers: &[Column]) -> Vec<KeyPart> {
        identifiers.iter().map(|c| self.key_part(*c)).collect()
    }

    fn key_part(&self, column: Column) -> KeyPart {
        match column {
            Column::UpdatedAt => KeyPart::Text(self.updated_at.clone()),
            Column::Year => KeyPart::number(self.year as f64),
            Column::Month => KeyPart::number(self.month as f64),
            Column::Day => self
                .day
                .map_or(KeyPart::Null, |d| KeyPart::number(d as f64)),
            Column::From => KeyPart::Text(self.from.clone()),
            Column::To => KeyPart::Text(self.to.clone()),
            Column::Value => self.value.map_or(KeyPart::Null, KeyPart::number),
        }
    }
}
