use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// The six telemetry feeds the Hat writes to Firebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Detections,
    Locations,
    Ultrasonic,
    Battery,
    Motion,
    SystemHealth,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Detections,
        Collection::Locations,
        Collection::Ultrasonic,
        Collection::Battery,
        Collection::Motion,
        Collection::SystemHealth,
    ];

    /// Path in the Realtime Database or Firestore collection id.
    pub fn remote_name(&self) -> &'static str {
        match self {
            Collection::Detections => "detections",
            Collection::Locations => "location_logs",
            Collection::Ultrasonic => "ultrasonic_logs",
            Collection::Battery => "battery_logs",
            Collection::Motion => "motion_logs",
            Collection::SystemHealth => "system_health_logs",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.remote_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Detection,
    SystemStats,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub event_type: EventKind,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub estimated_distance_cm: Option<f64>,
    #[serde(default, rename = "CPU")]
    pub cpu: Option<f64>,
    #[serde(default, rename = "MEM")]
    pub mem: Option<f64>,
    #[serde(default, rename = "TEMP")]
    pub temp: Option<f64>,
}

impl DetectionEvent {
    pub fn is_detection(&self) -> bool {
        self.event_type == EventKind::Detection
    }

    pub fn is_system_stats(&self) -> bool {
        self.event_type == EventKind::SystemStats
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub speed: Option<f64>,
    /// Metres from the previous fix; filled in after fetching.
    #[serde(default, skip_deserializing)]
    pub distance_meters: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UltrasonicReading {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub distance_cm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryReading {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub battery_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub motion_status: String,
}

impl MotionSample {
    pub fn is_active(&self) -> bool {
        self.motion_status == "active"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub sensor_name: String,
    #[serde(default)]
    pub sensor_faults: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub collection: Collection,
    pub message: String,
}

/// One fetch of every collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub connected: bool,
    pub detections: Vec<DetectionEvent>,
    pub locations: Vec<LocationFix>,
    pub ultrasonic: Vec<UltrasonicReading>,
    pub battery: Vec<BatteryReading>,
    pub motion: Vec<MotionSample>,
    pub system_health: Vec<HealthRecord>,
    pub failures: Vec<SourceFailure>,
}

impl TelemetrySnapshot {
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn record_count(&self) -> usize {
        self.detections.len()
            + self.locations.len()
            + self.ultrasonic.len()
            + self.battery.len()
            + self.motion.len()
            + self.system_health.len()
    }

    /// Stable sort of every collection by timestamp.
    pub fn sort_chronologically(&mut self) {
        self.detections.sort_by_key(|r| r.timestamp);
        self.locations.sort_by_key(|r| r.timestamp);
        self.ultrasonic.sort_by_key(|r| r.timestamp);
        self.battery.sort_by_key(|r| r.timestamp);
        self.motion.sort_by_key(|r| r.timestamp);
        self.system_health.sort_by_key(|r| r.timestamp);
    }
}

/// Parses the timestamp shapes the Hat firmware has been seen to write.
pub fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().and_then(from_unix_seconds),
        serde_json::Value::String(s) => parse_timestamp_str(s),
        _ => None,
    }
}

pub fn parse_timestamp_str(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<f64>() {
        return from_unix_seconds(secs);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn from_unix_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::<Utc>::from_timestamp(whole as i64, nanos)
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    parse_timestamp(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        assert_eq!(parse_timestamp(&json!(1709294400)), Some(expected));
        assert_eq!(parse_timestamp(&json!("1709294400")), Some(expected));
        assert_eq!(parse_timestamp(&json!("2024-03-01T12:00:00Z")), Some(expected));
        assert_eq!(parse_timestamp(&json!("2024-03-01 12:00:00")), Some(expected));
        assert_eq!(parse_timestamp(&json!("yesterday")), None);
        assert_eq!(parse_timestamp(&json!(null)), None);
    }

    #[test]
    fn test_fractional_unix_seconds() {
        let ts = parse_timestamp(&json!(1709294400.5)).unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_detection_event_uses_device_field_names() {
        let event: DetectionEvent = serde_json::from_value(json!({
            "timestamp": 1709294400,
            "event_type": "system_stats",
            "CPU": 41.5,
            "MEM": 63.0,
            "TEMP": 55.2
        }))
        .unwrap();

        assert!(event.is_system_stats());
        assert_eq!(event.cpu, Some(41.5));
        assert_eq!(event.temp, Some(55.2));
        assert_eq!(event.label, None);
    }

    #[test]
    fn test_unknown_event_type_is_other() {
        let event: DetectionEvent = serde_json::from_value(json!({
            "timestamp": 1709294400,
            "event_type": "voice_command"
        }))
        .unwrap();
        assert_eq!(event.event_type, EventKind::Other);
    }

    #[test]
    fn test_location_ignores_incoming_distance() {
        let fix: LocationFix = serde_json::from_value(json!({
            "timestamp": "2024-03-01T12:00:00Z",
            "latitude": 51.5,
            "longitude": -0.12,
            "distance_meters": 99.0
        }))
        .unwrap();
        assert_eq!(fix.distance_meters, None);
        assert_eq!(fix.speed, None);
    }

    #[test]
    fn test_motion_active_is_exact_match() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let active = MotionSample {
            timestamp: ts,
            motion_status: "active".to_string(),
        };
        let shouting = MotionSample {
            timestamp: ts,
            motion_status: "ACTIVE".to_string(),
        };
        assert!(active.is_active());
        assert!(!shouting.is_active());
    }
}
