//! Sensor reading models and unit normalization.
//!
//! Raw sensor entries arrive from openSenseMap with a unit symbol, a
//! `createdAt` timestamp and a value. [`Measurement::normalize`] turns them
//! into canonical readings: temperatures always in Fahrenheit, humidity as-is.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::error::{Error, Result};

// ---

pub const HUMIDITY_UNIT: &str = "%";
pub const CELSIUS_UNIT: &str = "°C";
pub const FAHRENHEIT_UNIT: &str = "°F";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";
const RENDER_FORMAT: &str = "%A, %d. %B %Y %I:%M%p";

/// Raw sensor entry as found in the `sensors` array of a box payload.
#[derive(Debug, Deserialize)]
pub struct RawSensor {
    // ---
    pub unit: String,
    #[serde(rename = "lastMeasurement")]
    pub last_measurement: Option<RawMeasurement>,
}

/// The `lastMeasurement` object of a raw sensor entry.
#[derive(Debug, Deserialize)]
pub struct RawMeasurement {
    // ---
    #[serde(rename = "createdAt")]
    pub created_at: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Temperature,
    Humidity,
    Unknown,
}

impl Category {
    pub fn from_unit(unit: &str) -> Self {
        match unit {
            HUMIDITY_UNIT => Category::Humidity,
            CELSIUS_UNIT | FAHRENHEIT_UNIT => Category::Temperature,
            _ => Category::Unknown,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Temperature => "Temperature",
            Category::Humidity => "Humidity",
            Category::Unknown => "None",
        };
        f.write_str(name)
    }
}

/// A single normalized sensor reading.
///
/// Fields are private so that a `Temperature` can only ever carry the
/// Fahrenheit unit produced by [`Measurement::normalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    // ---
    category: Category,
    unit: String,
    value: String,
    observed_at: DateTime<Utc>,
}

impl Measurement {
    // ---
    /// Normalize a raw `(unit, createdAt, value)` triple.
    ///
    /// Returns `Ok(None)` for units outside humidity/Celsius/Fahrenheit; those
    /// entries never become measurements.
    pub fn normalize(unit: &str, raw_timestamp: &str, raw_value: &str) -> Result<Option<Self>> {
        // ---
        let category = Category::from_unit(unit);
        if category == Category::Unknown {
            return Ok(None);
        }

        let observed_at = parse_timestamp(raw_timestamp)?;

        let (unit, value) = match unit {
            CELSIUS_UNIT => {
                let celsius: f64 = raw_value.trim().parse().map_err(|_| {
                    Error::MalformedPayload(format!("non-numeric Celsius value '{raw_value}'"))
                })?;
                let fahrenheit = celsius * 1.8 + 32.0;
                (FAHRENHEIT_UNIT.to_string(), format!("{fahrenheit:?}"))
            }
            other => (other.to_string(), raw_value.to_string()),
        };

        Ok(Some(Measurement {
            category,
            unit,
            value,
            observed_at,
        }))
    }

    /// Normalize a deserialized sensor entry.
    pub fn from_raw(sensor: &RawSensor) -> Result<Option<Self>> {
        // ---
        if Category::from_unit(&sensor.unit) == Category::Unknown {
            return Ok(None);
        }
        let last = sensor.last_measurement.as_ref().ok_or_else(|| {
            Error::MalformedPayload(format!("sensor with unit '{}' has no lastMeasurement", sensor.unit))
        })?;
        let value = match &last.value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Err(Error::MalformedPayload(format!(
                    "unsupported measurement value {other}"
                )))
            }
        };
        Self::normalize(&sensor.unit, &last.created_at, &value)
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}{} Measured on: {}",
            self.category,
            self.value,
            self.unit,
            self.observed_at.format(RENDER_FORMAT)
        )
    }
}

/// Parse an openSenseMap `createdAt` value, e.g. `2024-06-01T14:30:05.123Z`.
///
/// Fractional seconds and the trailing `Z` are mandatory.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    // ---
    let has_fraction = raw
        .rsplit_once(':')
        .is_some_and(|(_, seconds)| seconds.contains('.'));
    if !has_fraction {
        return Err(Error::MalformedTimestamp(raw.to_string()));
    }

    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| Error::MalformedTimestamp(raw.to_string()))
}
