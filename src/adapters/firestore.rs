use crate::adapters::auth::Authenticator;
use crate::adapters::http::HttpFetcher;
use crate::utils::error::{Result, TelemetryError};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Lists Firestore collections through the v1 REST API.
#[derive(Debug, Clone)]
pub struct FirestoreClient {
    fetcher: HttpFetcher,
    base_url: String,
    project_id: String,
    auth: Authenticator,
    page_size: u32,
}

impl FirestoreClient {
    pub fn new(
        fetcher: HttpFetcher,
        base_url: &str,
        project_id: &str,
        auth: Authenticator,
        page_size: u32,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            auth,
            page_size,
        }
    }

    pub fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents/{}",
            self.base_url, self.project_id, collection
        )
    }

    /// Every document in the collection, decoded to plain JSON objects, in
    /// the order Firestore returns them.
    pub async fn list_documents(&self, collection: &str) -> Result<Vec<Map<String, Value>>> {
        let url = self.collection_url(collection);
        let page_size = self.page_size.to_string();
        let token = self.auth.token().await?;
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            tracing::debug!(
                "Listing firestore collection {} (page token: {:?})",
                collection,
                page_token
            );
            let body = self
                .fetcher
                .send_json("firestore", |client| {
                    let mut request = client.get(&url).query(&[("pageSize", &page_size)]);
                    if let Some(token) = &page_token {
                        request = request.query(&[("pageToken", token)]);
                    }
                    if let Some(token) = &token {
                        request = request.bearer_auth(token.secret());
                    }
                    request
                })
                .await?;

            let page: ListDocumentsPage =
                serde_json::from_value(body).map_err(|e| TelemetryError::Decode {
                    collection: collection.to_string(),
                    message: e.to_string(),
                })?;

            for document in page.documents {
                documents.push(decode_fields(document.fields));
            }

            match page.next_page_token {
                Some(next) if next.is_empty() => break,
                Some(next) if page_token.as_deref() == Some(next.as_str()) => {
                    tracing::warn!(
                        "Firestore repeated page token for {}, stopping after {} documents",
                        collection,
                        documents.len()
                    );
                    break;
                }
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(documents)
    }

    /// Lists and deserializes a collection; documents that do not fit `T`
    /// are skipped with a warning.
    pub async fn fetch_collection<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let documents = self.list_documents(collection).await?;
        Ok(deserialize_documents(collection, documents))
    }
}

pub fn deserialize_documents<T: DeserializeOwned>(
    collection: &str,
    documents: Vec<Map<String, Value>>,
) -> Vec<T> {
    let total = documents.len();
    let records: Vec<T> = documents
        .into_iter()
        .enumerate()
        .filter_map(|(index, document)| {
            match serde_json::from_value::<T>(Value::Object(document)) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping {} document #{}: {}", collection, index, e);
                    None
                }
            }
        })
        .collect();

    if records.len() < total {
        tracing::warn!(
            "{}: kept {} of {} documents",
            collection,
            records.len(),
            total
        );
    }
    records
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsPage {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct Document {
    #[serde(default)]
    fields: Map<String, Value>,
}

pub fn decode_fields(fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(name, value)| (name, decode_value(value)))
        .collect()
}

/// Unwraps a Firestore typed value (`{"doubleValue": 1.5}`) into plain JSON.
pub fn decode_value(value: Value) -> Value {
    let Value::Object(mut typed) = value else {
        return value;
    };

    if let Some(v) = typed.remove("stringValue") {
        return v;
    }
    if let Some(v) = typed.remove("integerValue") {
        return match v {
            Value::String(s) => match s.parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => Value::String(s),
            },
            other => other,
        };
    }
    if let Some(v) = typed.remove("doubleValue") {
        return match v {
            // NaN and Infinity arrive as strings.
            Value::String(s) => s
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            other => other,
        };
    }
    if let Some(v) = typed.remove("booleanValue") {
        return v;
    }
    if let Some(v) = typed.remove("timestampValue") {
        return v;
    }
    if typed.contains_key("nullValue") {
        return Value::Null;
    }
    if let Some(v) = typed.remove("referenceValue") {
        return v;
    }
    if let Some(v) = typed.remove("bytesValue") {
        return v;
    }
    if let Some(v) = typed.remove("geoPointValue") {
        return v;
    }
    if let Some(Value::Object(mut map)) = typed.remove("mapValue") {
        return match map.remove("fields") {
            Some(Value::Object(fields)) => Value::Object(decode_fields(fields)),
            _ => Value::Object(Map::new()),
        };
    }
    if let Some(Value::Object(mut array)) = typed.remove("arrayValue") {
        return match array.remove("values") {
            Some(Value::Array(values)) => {
                Value::Array(values.into_iter().map(decode_value).collect())
            }
            _ => Value::Array(Vec::new()),
        };
    }

    Value::Object(typed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceSettings;
    use crate::domain::model::LocationFix;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_decode_scalar_values() {
        assert_eq!(decode_value(json!({"stringValue": "active"})), json!("active"));
        assert_eq!(decode_value(json!({"integerValue": "42"})), json!(42));
        assert_eq!(decode_value(json!({"doubleValue": 3.5})), json!(3.5));
        assert_eq!(decode_value(json!({"booleanValue": true})), json!(true));
        assert_eq!(decode_value(json!({"nullValue": null})), Value::Null);
        assert_eq!(
            decode_value(json!({"timestampValue": "2024-03-01T12:00:00Z"})),
            json!("2024-03-01T12:00:00Z")
        );
        assert_eq!(decode_value(json!({"doubleValue": "NaN"})), Value::Null);
    }

    #[test]
    fn test_decode_nested_values() {
        let decoded = decode_value(json!({
            "mapValue": {"fields": {
                "faults": {"arrayValue": {"values": [
                    {"stringValue": "gps"},
                    {"integerValue": "2"}
                ]}},
                "ok": {"booleanValue": false}
            }}
        }));
        assert_eq!(decoded, json!({"faults": ["gps", 2], "ok": false}));

        assert_eq!(decode_value(json!({"arrayValue": {}})), json!([]));
        assert_eq!(decode_value(json!({"mapValue": {}})), json!({}));
    }

    #[test]
    fn test_deserialize_documents_skips_invalid() {
        let documents = vec![
            decode_fields(
                json!({
                    "timestamp": {"timestampValue": "2024-03-01T12:00:00Z"},
                    "latitude": {"doubleValue": 51.5},
                    "longitude": {"doubleValue": -0.12}
                })
                .as_object()
                .unwrap()
                .clone(),
            ),
            decode_fields(
                json!({"latitude": {"doubleValue": 51.5}})
                    .as_object()
                    .unwrap()
                    .clone(),
            ),
        ];

        let fixes: Vec<LocationFix> = deserialize_documents("location_logs", documents);
        assert_eq!(fixes.len(), 1);
        assert_eq!(fixes[0].latitude, 51.5);
    }

    #[tokio::test]
    async fn test_list_documents_follows_pages() {
        let server = MockServer::start();
        let path = "/v1/projects/smart-hat/databases/(default)/documents/battery_logs";

        // Registered first so token-bearing requests match it before the
        // catch-all first page.

        let second_page = server.mock(|when, then| {
            when.method(GET)
                .path(path)
                .query_param("pageToken", "page-2")
                .header("Authorization", "Bearer token-123");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "documents": [
                        {"name": "b2", "fields": {
                            "timestamp": {"integerValue": "1709294460"},
                            "battery_percentage": {"integerValue": "79"}
                        }}
                    ]
                }));
        });
        let first_page = server.mock(|when, then| {
            when.method(GET)
                .path(path)
                .query_param("pageSize", "1")
                .header("Authorization", "Bearer token-123");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "documents": [
                        {"name": "b1", "fields": {
                            "timestamp": {"integerValue": "1709294400"},
                            "battery_percentage": {"doubleValue": 80.5}
                        }}
                    ],
                    "nextPageToken": "page-2"
                }));
        });

        let settings = SourceSettings::default();
        let client = FirestoreClient::new(
            HttpFetcher::new(&settings).unwrap(),
            &server.base_url(),
            "smart-hat",
            Authenticator::Configured("token-123".to_string()),
            1,
        );

        let documents = client.list_documents("battery_logs").await.unwrap();

        first_page.assert();
        second_page.assert();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0]["battery_percentage"], json!(80.5));
        assert_eq!(documents[1]["battery_percentage"], json!(79));
    }

    #[tokio::test]
    async fn test_repeated_page_token_stops_listing() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/projects/smart-hat/databases/(default)/documents/motion_logs");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "documents": [
                        {"name": "m1", "fields": {
                            "timestamp": {"integerValue": "1709294400"},
                            "motion_status": {"stringValue": "active"}
                        }}
                    ],
                    "nextPageToken": "stuck"
                }));
        });

        let client = FirestoreClient::new(
            HttpFetcher::new(&SourceSettings::default()).unwrap(),
            &server.base_url(),
            "smart-hat",
            Authenticator::Anonymous,
            300,
        );

        let documents = client.list_documents("motion_logs").await.unwrap();
        mock.assert_hits(2);
        assert_eq!(documents.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_collection() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/projects/smart-hat/databases/(default)/documents/motion_logs");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({}));
        });

        let settings = SourceSettings::default();
        let client = FirestoreClient::new(
            HttpFetcher::new(&settings).unwrap(),
            &server.base_url(),
            "smart-hat",
            Authenticator::Anonymous,
            300,
        );

        let documents = client.list_documents("motion_logs").await.unwrap();
        mock.assert();
        assert!(documents.is_empty());
    }
}
