use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use std::time::Duration;

/// Drives a [`Pipeline`] once or on a fixed refresh interval.
pub struct RefreshEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> RefreshEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run_once(&self) -> Result<String> {
        tracing::info!("🔄 Refreshing dashboard");
        self.monitor.log_stats("Start");

        let snapshot = self.pipeline.extract().await?;
        tracing::info!(
            "📥 Extracted {} records (connected: {}, failed sources: {})",
            snapshot.record_count(),
            snapshot.connected,
            snapshot.failures.len()
        );
        self.monitor.log_stats("Extract");

        let view = self.pipeline.transform(snapshot).await?;
        tracing::info!(
            "🧮 Built view: {} detections, {:.1} m walked",
            view.summary.detection_count,
            view.summary.total_distance_m
        );
        if view.summary.low_battery {
            tracing::warn!(
                "🔋 Hat battery low: {:.0}%",
                view.summary.latest_battery_percent.unwrap_or_default()
            );
        }
        if view.summary.overheating {
            tracing::warn!(
                "🌡️ Hat overheating: {:.1}°C",
                view.summary.latest_temperature_celsius.unwrap_or_default()
            );
        }
        self.monitor.log_stats("Transform");

        let output_path = self.pipeline.load(view).await?;
        tracing::info!("📁 Dashboard written to {}", output_path);
        self.monitor.log_stats("Load");

        Ok(output_path)
    }

    /// Refreshes every `interval` until `max_cycles` attempts or Ctrl-C.
    /// Failed cycles are logged and count as attempts. Returns the number of
    /// successful refreshes.
    pub async fn run_periodic(&self, interval: Duration, max_cycles: Option<u64>) -> u64 {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut completed = 0u64;
        let mut cycle = 0u64;
        loop {
            if max_cycles.is_some_and(|max| cycle >= max) {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("🛑 Shutdown requested");
                    break;
                }
            }

            cycle += 1;
            match self.run_once().await {
                Ok(_) => completed += 1,
                Err(e) => {
                    tracing::error!(
                        "❌ Refresh #{} failed: {} (Category: {:?}, Severity: {:?})",
                        cycle,
                        e,
                        e.category(),
                        e.severity()
                    );
                    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
                }
            }
        }

        self.monitor.log_final_stats();
        completed
    }
}
