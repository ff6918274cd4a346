use crate::adapters::auth::{Authenticator, RequestToken};
use crate::adapters::http::HttpFetcher;
use crate::domain::model::{parse_timestamp_str, DetectionEvent};
use crate::utils::error::{Result, TelemetryError};
use serde_json::Value;

/// Reads JSON subtrees from the Firebase Realtime Database REST API.
#[derive(Debug, Clone)]
pub struct RealtimeDbClient {
    fetcher: HttpFetcher,
    database_url: String,
    auth: Authenticator,
}

impl RealtimeDbClient {
    pub fn new(fetcher: HttpFetcher, database_url: &str, auth: Authenticator) -> Self {
        Self {
            fetcher,
            database_url: database_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    pub fn path_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.database_url, path.trim_matches('/'))
    }

    pub async fn get(&self, path: &str) -> Result<Value> {
        let url = self.path_url(path);
        tracing::debug!("Fetching realtime database path {}", url);
        let token = self.auth.token().await?;
        self.fetcher
            .send_json("realtime-db", |client| {
                let request = client.get(&url);
                match &token {
                    Some(RequestToken::Configured(secret)) => request.query(&[("auth", secret)]),
                    Some(RequestToken::OAuth(access)) => {
                        request.query(&[("access_token", access)])
                    }
                    None => request,
                }
            })
            .await
    }

    pub async fn fetch_detections(&self, path: &str) -> Result<Vec<DetectionEvent>> {
        let body = self.get(path).await?;
        decode_detections(path, body)
    }
}

/// Detections are stored keyed by the Unix time the Hat logged them.
pub fn decode_detections(path: &str, body: Value) -> Result<Vec<DetectionEvent>> {
    let entries = match body {
        Value::Null => return Ok(Vec::new()),
        Value::Object(entries) => entries,
        other => {
            return Err(TelemetryError::Decode {
                collection: path.to_string(),
                message: format!("expected an object keyed by timestamp, got {}", kind(&other)),
            })
        }
    };

    let mut events = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let Some(timestamp) = parse_timestamp_str(&key) else {
            tracing::warn!("Skipping {} entry with non-timestamp key '{}'", path, key);
            continue;
        };
        let Value::Object(mut fields) = value else {
            tracing::warn!("Skipping {} entry {}: not an object", path, key);
            continue;
        };
        fields.insert(
            "timestamp".to_string(),
            Value::String(timestamp.to_rfc3339()),
        );
        match serde_json::from_value::<DetectionEvent>(Value::Object(fields)) {
            Ok(event) => events.push(event),
            Err(e) => tracing::warn!("Skipping {} entry {}: {}", path, key, e),
        }
    }

    Ok(events)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceSettings;
    use crate::domain::model::EventKind;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_decode_null_is_empty() {
        assert!(decode_detections("detections", Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_decode_array_is_error() {
        let result = decode_detections("detections", json!([1, 2]));
        assert!(matches!(result, Err(TelemetryError::Decode { .. })));
    }

    #[test]
    fn test_decode_skips_bad_entries() {
        let events = decode_detections(
            "detections",
            json!({
                "1709294400": {"event_type": "detection", "label": "person", "confidence": 0.91},
                "1709294460": {"event_type": "system_stats", "CPU": 35.0, "MEM": 48.5, "TEMP": 61.0},
                "not-a-time": {"event_type": "detection", "label": "car"},
                "1709294520": "garbage",
                "1709294580": {"label": "missing event type"}
            }),
        )
        .unwrap();

        assert_eq!(events.len(), 2);
        let person = events.iter().find(|e| e.is_detection()).unwrap();
        assert_eq!(person.label.as_deref(), Some("person"));
        assert_eq!(person.timestamp.timestamp(), 1709294400);
        let stats = events
            .iter()
            .find(|e| e.event_type == EventKind::SystemStats)
            .unwrap();
        assert_eq!(stats.mem, Some(48.5));
    }

    #[tokio::test]
    async fn test_fetch_sends_auth_parameter() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/detections.json")
                .query_param("auth", "secret-token");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "1709294400": {"event_type": "detection", "label": "door", "confidence": 0.7}
                }));
        });

        let fetcher = HttpFetcher::new(&SourceSettings::default()).unwrap();
        let client = RealtimeDbClient::new(
            fetcher,
            &format!("{}/", server.base_url()),
            Authenticator::Configured("secret-token".to_string()),
        );

        let events = client.fetch_detections("/detections").await.unwrap();

        mock.assert();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].label.as_deref(), Some("door"));
    }
}
