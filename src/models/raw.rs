use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A measurement exactly as the API returned it.
///
/// The record is kept as the original JSON value. Nothing is typed at
/// decode time, so a record with a missing or wrongly typed field still
/// decodes with the rest of its page and is rejected (or skipped) by the
/// transformer. The bronze tier stores this value unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawMeasurement(Value);

impl RawMeasurement {
    pub fn new(
        location: &str,
        parameter: &str,
        value: f64,
        unit: &str,
        latitude: f64,
        longitude: f64,
        utc: &str,
    ) -> Self {
        Self(json!({
            "location": location,
            "parameter": parameter,
            "value": value,
            "unit": unit,
            "coordinates": {"latitude": latitude, "longitude": longitude},
            "date": {"utc": utc},
        }))
    }

    /// The record as received.
    pub fn payload(&self) -> &Value {
        &self.0
    }

    /// Field at a dotted path such as `date.utc`. JSON `null` counts as
    /// absent.
    pub fn field(&self, path: &str) -> Option<&Value> {
        // get() on a non-object is None, so "coordinates": "x" has no latitude
        path.split('.')
            .try_fold(&self.0, |node, key| node.get(key))
            .filter(|value| !value.is_null())
    }

    pub fn text(&self, path: &str) -> Option<&str> {
        self.field(path).and_then(Value::as_str)
    }

    pub fn number(&self, path: &str) -> Option<f64> {
        self.field(path).and_then(Value::as_f64)
    }

    /// Nested object at `path` as compact JSON text, for the bronze tier.
    pub fn json_text(&self, path: &str) -> Option<String> {
        self.field(path).map(Value::to_string)
    }
}

impl From<Value> for RawMeasurement {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Envelope of one page from the measurements endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeasurementPage {
    #[serde(default)]
    pub meta: Option<PageMeta>,

    #[serde(default)]
    pub results: Vec<RawMeasurement>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageMeta {
    /// Either a number or a lower bound such as `">1000"`.
    #[serde(default)]
    pub found: Option<Value>,
}

impl PageMeta {
    /// Exact number of matching records, when the API reports one.
    pub fn found_count(&self) -> Option<u64> {
        self.found.as_ref().and_then(Value::as_u64)
    }
}
