//! Payload parsing: one upstream body → one [`Snapshot`].

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{Measurement, RawSensor};

// ---

/// Measurements extracted from a single box payload, in payload order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    measurements: Vec<Measurement>,
}

impl Snapshot {
    // ---
    /// Parse a raw box payload.
    ///
    /// The payload must be JSON with a `sensors` array, either at the top
    /// level or under `properties` for GeoJSON bodies. Sensors with an
    /// unsupported unit are dropped; a malformed sensor entry is logged and
    /// skipped so one bad record does not discard the rest of the box.
    pub fn parse(payload: &str) -> Result<Self> {
        // ---
        let body: Value = serde_json::from_str(payload)
            .map_err(|e| Error::MalformedPayload(format!("invalid JSON: {e}")))?;

        // `format=geojson` wraps the box in a Feature with the box under `properties`.
        let sensors = body
            .get("sensors")
            .or_else(|| body.pointer("/properties/sensors"))
            .and_then(|s| s.as_array())
            .ok_or_else(|| Error::MalformedPayload("missing 'sensors' array".to_string()))?;

        let mut measurements = Vec::with_capacity(sensors.len());
        for (i, item) in sensors.iter().enumerate() {
            let raw = match serde_json::from_value::<RawSensor>(item.clone()) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Skipping sensor {}: {} - Raw item: {}", i, e, item);
                    continue;
                }
            };

            match Measurement::from_raw(&raw) {
                Ok(Some(m)) => measurements.push(m),
                Ok(None) => debug!("Ignoring sensor {} with unit '{}'", i, raw.unit),
                Err(e) => warn!("Skipping sensor {}: {}", i, e),
            }
        }

        debug!(
            "Parsed {} of {} sensors into snapshot",
            measurements.len(),
            sensors.len()
        );
        Ok(Snapshot { measurements })
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Rendered measurement lines, one per measurement.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.measurements.iter().map(|m| m.to_string())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    // ---
    use super::*;
    use crate::models::{Category, FAHRENHEIT_UNIT};
    use serde_json::json;
    use tokio_test::assert_ok;

    /// A payload shaped like `GET /boxes/{id}` from openSenseMap.
    pub(crate) fn sample_payload(celsius: &str) -> String {
        json!({
            "_id": "5a0c2cc89fd3c200111118f0",
            "name": "Balkon",
            "sensors": [
                {
                    "title": "Temperatur",
                    "unit": "°C",
                    "lastMeasurement": { "createdAt": "2024-06-01T14:30:05.123Z", "value": celsius }
                },
                {
                    "title": "Luftdruck",
                    "unit": "hPa",
                    "lastMeasurement": { "createdAt": "2024-06-01T14:30:05.123Z", "value": "1012.4" }
                },
                {
                    "title": "rel. Luftfeuchte",
                    "unit": "%",
                    "lastMeasurement": { "createdAt": "2024-06-01T14:30:06.000Z", "value": "48.20" }
                }
            ]
        })
        .to_string()
    }

    #[test]
    fn test_supported_sensors_in_order() {
        // ---
        let snapshot = assert_ok!(Snapshot::parse(&sample_payload("20")));
        assert_eq!(snapshot.len(), 2);

        let m = snapshot.measurements();
        assert_eq!(m[0].category(), Category::Temperature);
        assert_eq!(m[0].unit(), FAHRENHEIT_UNIT);
        assert_eq!(m[0].value(), "68.0");
        assert_eq!(m[1].category(), Category::Humidity);
        assert_eq!(m[1].value(), "48.20");
    }

    #[test]
    fn test_unsupported_units_not_counted() {
        // ---
        let payload = json!({
            "sensors": [
                { "unit": "lx", "lastMeasurement": { "createdAt": "2024-06-01T14:30:05.123Z", "value": "300" } },
                { "unit": "µg/m³" },
                { "unit": "dB" }
            ]
        });
        let snapshot = assert_ok!(Snapshot::parse(&payload.to_string()));
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_malformed_sensor_is_skipped() {
        // ---
        let payload = json!({
            "sensors": [
                { "title": "no unit" },
                { "unit": "°C", "lastMeasurement": null },
                { "unit": "°C", "lastMeasurement": { "createdAt": "not a time", "value": "20" } },
                { "unit": "°F", "lastMeasurement": { "createdAt": "2024-06-01T14:30:05.123Z", "value": "70.1" } }
            ]
        });
        let snapshot = assert_ok!(Snapshot::parse(&payload.to_string()));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.measurements()[0].value(), "70.1");
    }

    #[test]
    fn test_geojson_feature_payload() {
        // ---
        let payload = json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [7.64, 51.96] },
            "properties": {
                "_id": "5a0c2cc89fd3c200111118f0",
                "sensors": [
                    { "unit": "°C", "lastMeasurement": { "createdAt": "2024-06-01T14:30:05.123Z", "value": "20" } },
                    { "unit": "%", "lastMeasurement": { "createdAt": "2024-06-01T14:30:05.123Z", "value": "48.20" } }
                ]
            }
        });
        let snapshot = assert_ok!(Snapshot::parse(&payload.to_string()));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.measurements()[0].value(), "68.0");

        let no_sensors = json!({ "type": "Feature", "properties": { "name": "Balkon" } });
        assert!(matches!(
            Snapshot::parse(&no_sensors.to_string()),
            Err(Error::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_payload_without_sensors_is_rejected() {
        // ---
        for payload in ["{}", r#"{"sensors": "none"}"#, "<html>502</html>", ""] {
            assert!(
                matches!(Snapshot::parse(payload), Err(Error::MalformedPayload(_))),
                "{payload}"
            );
        }
    }

    #[test]
    fn test_lines_render_each_measurement() {
        // ---
        let snapshot = Snapshot::parse(&sample_payload("20")).unwrap();
        let lines: Vec<String> = snapshot.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Temperature: 68.0°F Measured on: Saturday, 01. June 2024 02:30PM".to_string(),
                "Humidity: 48.20% Measured on: Saturday, 01. June 2024 02:30PM".to_string(),
            ]
        );
    }
}
