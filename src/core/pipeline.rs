use crate::core::aggregate::build_view;
use crate::core::live_view::LiveView;
use crate::core::{ConfigProvider, Pipeline, Storage, TelemetrySource};
use crate::domain::model::TelemetrySnapshot;
use crate::domain::view::{DashboardView, Table};
use crate::utils::error::Result;
use serde_json::Value;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const DASHBOARD_FILE: &str = "dashboard.json";
pub const EXPORT_ARCHIVE_FILE: &str = "telemetry_export.zip";

pub struct DashboardPipeline<S: Storage, C: ConfigProvider, T: TelemetrySource> {
    storage: S,
    config: C,
    source: T,
    live_view: Option<LiveView>,
}

impl<S: Storage, C: ConfigProvider, T: TelemetrySource> DashboardPipeline<S, C, T> {
    pub fn new(storage: S, config: C, source: T) -> Self {
        Self {
            storage,
            config,
            source,
            live_view: None,
        }
    }

    /// Also publish every loaded view to `live_view`.
    pub fn with_live_view(mut self, live_view: LiveView) -> Self {
        self.live_view = Some(live_view);
        self
    }

    pub fn config(&self) -> &C {
        &self.config
    }
}

/// Renders a table as CSV with the table's column order.
pub fn table_to_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(cell_text))?;
    }
    writer
        .into_inner()
        .map_err(|e| crate::utils::error::TelemetryError::Io(e.into_error()))
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Zip with the view plus one CSV per table.
pub fn build_export_archive(view: &DashboardView, dashboard_json: &[u8]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    zip.start_file::<_, ()>(DASHBOARD_FILE, FileOptions::default())?;
    zip.write_all(dashboard_json)?;

    for (name, table) in [
        ("detections.csv", &view.tables.detections),
        ("locations.csv", &view.tables.locations),
        ("system_health.csv", &view.tables.system_health),
    ] {
        zip.start_file::<_, ()>(name, FileOptions::default())?;
        zip.write_all(&table_to_csv(table)?)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, T: TelemetrySource> Pipeline for DashboardPipeline<S, C, T> {
    async fn extract(&self) -> Result<TelemetrySnapshot> {
        if !self.source.is_connected() {
            tracing::debug!("Telemetry source is disconnected, serving empty snapshot");
        }

        match self.source.fetch_snapshot().await {
            Ok(snapshot) => {
                tracing::debug!(
                    "Snapshot: {} detections, {} locations, {} ultrasonic, {} battery, {} motion, {} health",
                    snapshot.detections.len(),
                    snapshot.locations.len(),
                    snapshot.ultrasonic.len(),
                    snapshot.battery.len(),
                    snapshot.motion.len(),
                    snapshot.system_health.len()
                );
                Ok(snapshot)
            }
            Err(e) => {
                tracing::error!("Error fetching Firebase data: {}", e);
                Ok(TelemetrySnapshot::disconnected())
            }
        }
    }

    async fn transform(&self, snapshot: TelemetrySnapshot) -> Result<DashboardView> {
        Ok(build_view(
            snapshot,
            self.config.dashboard(),
            chrono::Utc::now(),
        ))
    }

    async fn load(&self, view: DashboardView) -> Result<String> {
        let output_path = format!("{}/{}", self.config.output_path(), DASHBOARD_FILE);
        let dashboard_json = serde_json::to_vec_pretty(&view)?;

        tracing::debug!("Writing {} ({} bytes)", DASHBOARD_FILE, dashboard_json.len());
        self.storage
            .write_file(DASHBOARD_FILE, &dashboard_json)
            .await?;

        if self.config.export_archive() {
            let archive = build_export_archive(&view, &dashboard_json)?;
            tracing::debug!("Writing {} ({} bytes)", EXPORT_ARCHIVE_FILE, archive.len());
            self.storage
                .write_file(EXPORT_ARCHIVE_FILE, &archive)
                .await?;
        }

        if let Some(live_view) = &self.live_view {
            live_view.publish(&dashboard_json, view.generated_at).await;
        }

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DashboardSettings, SourceSettings};
    use crate::domain::model::{DetectionEvent, EventKind};
    use crate::domain::view::{ConnectionStatus, Panel};
    use crate::utils::error::TelemetryError;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::io::Read;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                TelemetryError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        source: SourceSettings,
        dashboard: DashboardSettings,
        export_archive: bool,
    }

    impl MockConfig {
        fn new(export_archive: bool) -> Self {
            Self {
                source: SourceSettings::default(),
                dashboard: DashboardSettings::default(),
                export_archive,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn source(&self) -> &SourceSettings {
            &self.source
        }

        fn dashboard(&self) -> &DashboardSettings {
            &self.dashboard
        }

        fn output_path(&self) -> &str {
            "test_output"
        }

        fn export_archive(&self) -> bool {
            self.export_archive
        }
    }

    struct StaticSource(TelemetrySnapshot);

    #[async_trait]
    impl TelemetrySource for StaticSource {
        async fn fetch_snapshot(&self) -> Result<TelemetrySnapshot> {
            Ok(self.0.clone())
        }

        fn is_connected(&self) -> bool {
            true
        }
    }

    struct FailingSource;

    #[async_trait]
    impl TelemetrySource for FailingSource {
        async fn fetch_snapshot(&self) -> Result<TelemetrySnapshot> {
            Err(TelemetryError::Processing {
                message: "boom".to_string(),
            })
        }

        fn is_connected(&self) -> bool {
            true
        }
    }

    fn sample_snapshot() -> TelemetrySnapshot {
        TelemetrySnapshot {
            connected: true,
            detections: vec![DetectionEvent {
                timestamp: Utc.timestamp_opt(1_709_294_400, 0).unwrap(),
                event_type: EventKind::Detection,
                label: Some("stairs, down".to_string()),
                confidence: Some(0.83),
                estimated_distance_cm: None,
                cpu: None,
                mem: None,
                temp: None,
            }],
            ..TelemetrySnapshot::default()
        }
    }

    #[tokio::test]
    async fn test_extract_failure_serves_disconnected_snapshot() {
        let pipeline = DashboardPipeline::new(MockStorage::new(), MockConfig::new(false), FailingSource);

        let snapshot = pipeline.extract().await.unwrap();

        assert!(!snapshot.connected);
        assert_eq!(snapshot.record_count(), 0);

        let view = pipeline.transform(snapshot).await.unwrap();
        assert!(matches!(view.status, ConnectionStatus::Disconnected { .. }));
        assert!(view.panels.cpu.is_empty());
    }

    #[tokio::test]
    async fn test_load_writes_dashboard_json() {
        let storage = MockStorage::new();
        let pipeline = DashboardPipeline::new(
            storage.clone(),
            MockConfig::new(false),
            StaticSource(sample_snapshot()),
        );

        let snapshot = pipeline.extract().await.unwrap();
        let view = pipeline.transform(snapshot).await.unwrap();
        let path = pipeline.load(view).await.unwrap();

        assert_eq!(path, "test_output/dashboard.json");
        let written = storage.get_file(DASHBOARD_FILE).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&written).unwrap();
        assert_eq!(json["status"]["state"], "connected");
        assert_eq!(json["panels"]["confidence"]["kind"], "histogram");
        assert_eq!(json["panels"]["battery"]["kind"], "empty");
        assert_eq!(json["panels"]["battery"]["message"], "No data available");
        assert!(storage.get_file(EXPORT_ARCHIVE_FILE).await.is_none());
    }

    #[tokio::test]
    async fn test_load_writes_export_archive() {
        let storage = MockStorage::new();
        let pipeline = DashboardPipeline::new(
            storage.clone(),
            MockConfig::new(true),
            StaticSource(sample_snapshot()),
        );

        let snapshot = pipeline.extract().await.unwrap();
        let view = pipeline.transform(snapshot).await.unwrap();
        assert!(matches!(view.panels.detection_frequency, Panel::Histogram(_)));
        pipeline.load(view).await.unwrap();

        let archive = storage.get_file(EXPORT_ARCHIVE_FILE).await.unwrap();
        let mut zip = zip::ZipArchive::new(std::io::Cursor::new(archive)).unwrap();
        assert_eq!(zip.len(), 4);

        let mut csv_content = String::new();
        zip.by_name("detections.csv")
            .unwrap()
            .read_to_string(&mut csv_content)
            .unwrap();
        let lines: Vec<&str> = csv_content.lines().collect();
        assert_eq!(lines[0], "timestamp,label,confidence,estimated_distance_cm");
        assert_eq!(lines[1], "2024-03-01T12:00:00+00:00,\"stairs, down\",0.83,");
    }

    #[tokio::test]
    async fn test_load_publishes_live_view() {
        let live_view = LiveView::new();
        let pipeline = DashboardPipeline::new(
            MockStorage::new(),
            MockConfig::new(false),
            StaticSource(sample_snapshot()),
        )
        .with_live_view(live_view.clone());

        let snapshot = pipeline.extract().await.unwrap();
        let view = pipeline.transform(snapshot).await.unwrap();
        let generated_at = view.generated_at;
        pipeline.load(view).await.unwrap();

        let published = live_view.latest().await.unwrap();
        assert_eq!(published.generated_at, generated_at);
        let json: serde_json::Value = serde_json::from_str(&published.json).unwrap();
        assert_eq!(json["summary"]["detection_count"], 1);
    }

    #[test]
    fn test_table_to_csv_header_only() {
        let table = Table::new(&["timestamp", "sensor_name", "sensor_faults"], 5);
        let csv = String::from_utf8(table_to_csv(&table).unwrap()).unwrap();
        assert_eq!(csv, "timestamp,sensor_name,sensor_faults\n");
    }
}
