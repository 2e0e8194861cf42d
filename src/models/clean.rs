use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A flattened, renamed measurement as stored in the silver tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CleanMeasurement {
    #[validate(length(min = 1))]
    pub location: String,

    pub parameter: String,

    pub pm25_value: f64,

    pub unit: String,

    pub datetime: DateTime<Utc>,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

/// Identity of a clean measurement: two records with the same key are the
/// same observation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeasurementKey {
    pub location: String,
    pub datetime: DateTime<Utc>,
    value_bits: u64,
}

impl CleanMeasurement {
    pub fn new(
        location: String,
        parameter: String,
        pm25_value: f64,
        unit: String,
        datetime: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            location,
            parameter,
            pm25_value,
            unit,
            datetime,
            latitude,
            longitude,
        }
    }

    pub fn key(&self) -> MeasurementKey {
        // -0.0 and 0.0 compare equal in SQL, so they must share a key here too
        let value = if self.pm25_value == 0.0 {
            0.0
        } else {
            self.pm25_value
        };
        MeasurementKey {
            location: self.location.clone(),
            datetime: self.datetime,
            value_bits: value.to_bits(),
        }
    }

    /// UTC calendar day the measurement belongs to.
    pub fn day(&self) -> NaiveDate {
        self.datetime.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn measurement(location: &str, value: f64, hour: u32) -> CleanMeasurement {
        CleanMeasurement::new(
            location.to_string(),
            "pm25".to_string(),
            value,
            "µg/m³".to_string(),
            Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            -1.28,
            36.82,
        )
    }

    #[test]
    fn test_key_identity() {
        let a = measurement("A", 10.0, 0);
        let b = measurement("A", 10.0, 0);
        let c = measurement("A", 10.5, 0);
        let d = measurement("B", 10.0, 0);

        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
        assert_ne!(a.key(), d.key());
    }

    #[test]
    fn test_signed_zero_shares_key() {
        assert_eq!(measurement("A", 0.0, 0).key(), measurement("A", -0.0, 0).key());
    }

    #[test]
    fn test_day_is_utc() {
        let late = measurement("A", 1.0, 23);
        assert_eq!(late.day(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_validation() {
        assert!(measurement("A", 1.0, 0).validate().is_ok());

        let mut bad = measurement("A", 1.0, 0);
        bad.latitude = 123.0;
        assert!(bad.validate().is_err());

        let mut unnamed = measurement("", 1.0, 0);
        unnamed.location = String::new();
        assert!(unnamed.validate().is_err());
    }
}
