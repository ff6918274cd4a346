//! Turns a [`TelemetrySnapshot`] into the dashboard view model.

use crate::config::DashboardSettings;
use crate::core::geo::{annotate_distances, total_distance};
use crate::domain::model::{DetectionEvent, TelemetrySnapshot};
use crate::domain::view::{
    ConnectionStatus, DashboardSummary, DashboardView, Histogram, HistogramBin, LabelCount,
    LineSeries, MapPoint, MapTrack, Panel, Panels, Scatter, ScatterPoint, SeriesPoint, Table,
    Tables, Threshold,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

pub const DETECTION_COLUMNS: [&str; 4] =
    ["timestamp", "label", "confidence", "estimated_distance_cm"];
pub const LOCATION_COLUMNS: [&str; 5] =
    ["timestamp", "latitude", "longitude", "speed", "distance_meters"];
pub const HEALTH_COLUMNS: [&str; 3] = ["timestamp", "sensor_name", "sensor_faults"];

const TOP_LABEL_LIMIT: usize = 5;

/// Upper bound on zero-filled detection frequency buckets.
pub const MAX_FREQUENCY_BUCKETS: usize = 1440;

pub fn build_view(
    mut snapshot: TelemetrySnapshot,
    settings: &DashboardSettings,
    now: DateTime<Utc>,
) -> DashboardView {
    annotate_distances(&mut snapshot.locations);

    let system_stats: Vec<&DetectionEvent> = snapshot
        .detections
        .iter()
        .filter(|e| e.is_system_stats())
        .collect();
    let detections: Vec<&DetectionEvent> = snapshot
        .detections
        .iter()
        .filter(|e| e.is_detection())
        .collect();

    let panels = Panels {
        cpu: metric_line(&system_stats, "Usage %", |e| e.cpu, None),
        memory: metric_line(&system_stats, "Usage %", |e| e.mem, None),
        temperature: metric_line(
            &system_stats,
            "°C",
            |e| e.temp,
            Some(Threshold {
                value: settings.temperature_alert_celsius,
                label: "Overheat".to_string(),
            }),
        ),
        detection_frequency: detection_frequency(&detections, settings.detection_bucket_secs),
        confidence: confidence_histogram(&detections, settings.confidence_bins),
        location: location_map(&snapshot, settings.map_zoom),
        battery: line_panel(
            "Battery %",
            snapshot
                .battery
                .iter()
                .map(|r| point(r.timestamp, r.battery_percentage))
                .collect(),
            Some(Threshold {
                value: settings.battery_alert_percent,
                label: "Low battery".to_string(),
            }),
            None,
        ),
        ultrasonic: line_panel(
            "Distance (cm)",
            snapshot
                .ultrasonic
                .iter()
                .map(|r| point(r.timestamp, r.distance_cm))
                .collect(),
            None,
            None,
        ),
        motion: line_panel(
            "Motion Status",
            snapshot
                .motion
                .iter()
                .map(|m| point(m.timestamp, if m.is_active() { 1.0 } else { 0.0 }))
                .collect(),
            None,
            Some(vec![
                (0.0, "Inactive".to_string()),
                (1.0, "Active".to_string()),
            ]),
        ),
        health: health_scatter(&snapshot),
    };

    let tables = Tables {
        detections: detection_table(&detections, settings.table_page_size),
        locations: location_table(&snapshot, settings.table_page_size),
        system_health: health_table(&snapshot, settings.table_page_size),
    };

    DashboardView {
        generated_at: now,
        status: connection_status(&snapshot),
        summary: summarize(&snapshot, &detections, &system_stats, settings),
        panels,
        tables,
    }
}

pub fn connection_status(snapshot: &TelemetrySnapshot) -> ConnectionStatus {
    if !snapshot.connected {
        return ConnectionStatus::Disconnected {
            message: "Failed to connect to Firebase".to_string(),
        };
    }
    if snapshot.failures.is_empty() {
        return ConnectionStatus::Connected {
            message: "Connected to Firebase".to_string(),
        };
    }

    let failed: Vec<String> = snapshot
        .failures
        .iter()
        .map(|f| f.collection.remote_name().to_string())
        .collect();
    ConnectionStatus::Degraded {
        message: format!("Connected to Firebase, {} source(s) unavailable", failed.len()),
        failed,
    }
}

fn point(timestamp: DateTime<Utc>, value: f64) -> SeriesPoint {
    SeriesPoint { timestamp, value }
}

fn line_panel(
    y_label: &str,
    points: Vec<SeriesPoint>,
    threshold: Option<Threshold>,
    ticks: Option<Vec<(f64, String)>>,
) -> Panel {
    if points.is_empty() {
        return Panel::empty();
    }
    Panel::Line(LineSeries {
        y_label: y_label.to_string(),
        points,
        threshold,
        ticks,
    })
}

fn metric_line(
    events: &[&DetectionEvent],
    y_label: &str,
    metric: impl Fn(&DetectionEvent) -> Option<f64>,
    threshold: Option<Threshold>,
) -> Panel {
    let points = events
        .iter()
        .filter_map(|e| metric(*e).map(|v| point(e.timestamp, v)))
        .collect();
    line_panel(y_label, points, threshold, None)
}

/// Detection counts per time bucket, buckets aligned to the Unix epoch.
///
/// Empty buckets between occupied ones are filled in while the span stays
/// within [`MAX_FREQUENCY_BUCKETS`]; past that only occupied buckets are kept.
pub fn detection_frequency(detections: &[&DetectionEvent], bucket_secs: u64) -> Panel {
    if detections.is_empty() {
        return Panel::empty();
    }

    let width = bucket_secs.clamp(1, i64::MAX as u64) as i64;
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for event in detections {
        *counts
            .entry(event.timestamp.timestamp().div_euclid(width))
            .or_insert(0) += 1;
    }

    let (first, last) = match (counts.keys().next(), counts.keys().next_back()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Panel::empty(),
    };
    let span = last.saturating_sub(first).saturating_add(1);
    if span as u64 <= MAX_FREQUENCY_BUCKETS as u64 {
        for bucket in first..=last {
            counts.entry(bucket).or_insert(0);
        }
    } else {
        tracing::warn!(
            "⚠️ Detections span {} buckets of {}s, showing occupied buckets only",
            span,
            width
        );
    }

    let bins = counts
        .into_iter()
        .map(|(bucket, count)| {
            let start = bucket as f64 * width as f64;
            HistogramBin {
                start,
                end: start + width as f64,
                count,
            }
        })
        .collect();

    Panel::Histogram(Histogram {
        x_label: "Time".to_string(),
        bins,
    })
}

/// Equal-width bins over [0, 1]; out-of-range scores are clamped.
pub fn confidence_histogram(detections: &[&DetectionEvent], bin_count: usize) -> Panel {
    let scores: Vec<f64> = detections
        .iter()
        .filter_map(|e| e.confidence)
        .filter(|c| c.is_finite())
        .collect();
    if scores.is_empty() {
        return Panel::empty();
    }

    let bin_count = bin_count.max(1);
    let width = 1.0 / bin_count as f64;
    let mut counts = vec![0usize; bin_count];
    for score in scores {
        let index = ((score.clamp(0.0, 1.0) / width) as usize).min(bin_count - 1);
        counts[index] += 1;
    }

    let bins = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: i as f64 * width,
            end: (i + 1) as f64 * width,
            count,
        })
        .collect();

    Panel::Histogram(Histogram {
        x_label: "Score".to_string(),
        bins,
    })
}

fn location_map(snapshot: &TelemetrySnapshot, zoom: u8) -> Panel {
    let Some(latest) = snapshot.locations.last() else {
        return Panel::empty();
    };

    Panel::Map(MapTrack {
        points: snapshot
            .locations
            .iter()
            .map(|fix| MapPoint {
                latitude: fix.latitude,
                longitude: fix.longitude,
                hover: fix.timestamp.to_rfc3339(),
            })
            .collect(),
        center: (latest.latitude, latest.longitude),
        zoom,
    })
}

fn health_scatter(snapshot: &TelemetrySnapshot) -> Panel {
    if snapshot.system_health.is_empty() {
        return Panel::empty();
    }

    Panel::Scatter(Scatter {
        y_label: "Sensor".to_string(),
        color_label: "Fault Status".to_string(),
        points: snapshot
            .system_health
            .iter()
            .map(|h| ScatterPoint {
                timestamp: h.timestamp,
                category: h.sensor_name.clone(),
                value: h.sensor_faults.clone(),
            })
            .collect(),
    })
}

fn opt_number(value: Option<f64>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

fn detection_table(detections: &[&DetectionEvent], page_size: usize) -> Table {
    let mut table = Table::new(&DETECTION_COLUMNS, page_size);
    table.rows = detections
        .iter()
        .map(|e| {
            vec![
                Value::String(e.timestamp.to_rfc3339()),
                e.label.clone().map(Value::String).unwrap_or(Value::Null),
                opt_number(e.confidence),
                opt_number(e.estimated_distance_cm),
            ]
        })
        .collect();
    table
}

fn location_table(snapshot: &TelemetrySnapshot, page_size: usize) -> Table {
    let mut table = Table::new(&LOCATION_COLUMNS, page_size);
    table.rows = snapshot
        .locations
        .iter()
        .map(|fix| {
            vec![
                Value::String(fix.timestamp.to_rfc3339()),
                Value::from(fix.latitude),
                Value::from(fix.longitude),
                opt_number(fix.speed),
                opt_number(fix.distance_meters),
            ]
        })
        .collect();
    table
}

fn health_table(snapshot: &TelemetrySnapshot, page_size: usize) -> Table {
    let mut table = Table::new(&HEALTH_COLUMNS, page_size);
    table.rows = snapshot
        .system_health
        .iter()
        .map(|h| {
            vec![
                Value::String(h.timestamp.to_rfc3339()),
                Value::String(h.sensor_name.clone()),
                h.sensor_faults.clone(),
            ]
        })
        .collect();
    table
}

fn top_labels(detections: &[&DetectionEvent]) -> Vec<LabelCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in detections.iter().filter_map(|e| e.label.as_deref()) {
        *counts.entry(label).or_insert(0) += 1;
    }

    let mut ranked: Vec<LabelCount> = counts
        .into_iter()
        .map(|(label, count)| LabelCount {
            label: label.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    ranked.truncate(TOP_LABEL_LIMIT);
    ranked
}

fn summarize(
    snapshot: &TelemetrySnapshot,
    detections: &[&DetectionEvent],
    system_stats: &[&DetectionEvent],
    settings: &DashboardSettings,
) -> DashboardSummary {
    let latest_battery_percent = snapshot.battery.last().map(|r| r.battery_percentage);
    let latest_temperature_celsius = system_stats.iter().rev().find_map(|e| e.temp);

    DashboardSummary {
        detection_count: detections.len(),
        top_labels: top_labels(detections),
        total_distance_m: total_distance(&snapshot.locations),
        latest_battery_percent,
        low_battery: latest_battery_percent
            .map(|p| p <= settings.battery_alert_percent)
            .unwrap_or(false),
        latest_temperature_celsius,
        overheating: latest_temperature_celsius
            .map(|t| t >= settings.temperature_alert_celsius)
            .unwrap_or(false),
        motion_active: snapshot.motion.last().map(|m| m.is_active()),
    }
}
