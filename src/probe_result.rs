use crate::probe::ProbeError;
use crate::store::Site;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub site_id: String,
    pub status: Status,
    /// Serialized as integer nanoseconds.
    #[serde(with = "nanos")]
    pub latency: Duration,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl CheckResult {
    pub fn from_success(site: &Site, started: DateTime<Utc>, latency: Duration) -> Self {
        CheckResult {
            site_id: site.id.clone(),
            status: Status::Up,
            latency,
            message: "OK".to_string(),
            timestamp: started,
        }
    }

    pub fn from_error(site: &Site, started: DateTime<Utc>, error: &ProbeError) -> Self {
        CheckResult::down(site, started, error.latency(), error.to_string())
    }

    pub fn down(
        site: &Site,
        started: DateTime<Utc>,
        latency: Duration,
        message: impl Into<String>,
    ) -> Self {
        CheckResult {
            site_id: site.id.clone(),
            status: Status::Down,
            latency,
            message: message.into(),
            timestamp: started,
        }
    }

    pub fn is_up(&self) -> bool {
        self.status == Status::Up
    }

    pub fn latency_ms(&self) -> u64 {
        self.latency.as_millis() as u64
    }
}

mod nanos {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_nanos()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Method;

    #[test]
    fn serializes_status_lowercase_and_latency_as_nanos() {
        let site = Site {
            id: "42".into(),
            target: "example.com".into(),
            name: "example".into(),
            method: Method::Http,
        };
        let result = CheckResult::from_success(&site, Utc::now(), Duration::from_millis(12));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["site_id"], "42");
        assert_eq!(json["status"], "up");
        assert_eq!(json["latency"], 12_000_000u64);
        assert_eq!(json["message"], "OK");
    }
}
