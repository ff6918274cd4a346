//! Render-ready dashboard view model.
//!
//! Everything here serializes to the JSON document a front end polls; no
//! styling is carried, only data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const NO_DATA_MESSAGE: &str = "No data available";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected { message: String },
    Degraded { message: String, failed: Vec<String> },
    Disconnected { message: String },
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        !matches!(self, ConnectionStatus::Disconnected { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub value: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSeries {
    pub y_label: String,
    pub points: Vec<SeriesPoint>,
    pub threshold: Option<Threshold>,
    /// Explicit y-axis ticks for categorical lines.
    pub ticks: Option<Vec<(f64, String)>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub x_label: String,
    pub bins: Vec<HistogramBin>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub hover: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapTrack {
    pub points: Vec<MapPoint>,
    pub center: (f64, f64),
    pub zoom: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scatter {
    pub y_label: String,
    pub color_label: String,
    pub points: Vec<ScatterPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Panel {
    Empty { message: String },
    Line(LineSeries),
    Histogram(Histogram),
    Map(MapTrack),
    Scatter(Scatter),
}

impl Panel {
    pub fn empty() -> Self {
        Panel::Empty {
            message: NO_DATA_MESSAGE.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Panel::Empty { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub page_size: usize,
}

impl Table {
    pub fn new(columns: &[&str], page_size: usize) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
            page_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub detection_count: usize,
    pub top_labels: Vec<LabelCount>,
    pub total_distance_m: f64,
    pub latest_battery_percent: Option<f64>,
    pub low_battery: bool,
    pub latest_temperature_celsius: Option<f64>,
    pub overheating: bool,
    pub motion_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panels {
    pub cpu: Panel,
    pub memory: Panel,
    pub temperature: Panel,
    pub detection_frequency: Panel,
    pub confidence: Panel,
    pub location: Panel,
    pub battery: Panel,
    pub ultrasonic: Panel,
    pub motion: Panel,
    pub health: Panel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tables {
    pub detections: Table,
    pub locations: Table,
    pub system_health: Table,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub generated_at: DateTime<Utc>,
    pub status: ConnectionStatus,
    pub summary: DashboardSummary,
    pub panels: Panels,
    pub tables: Tables,
}
