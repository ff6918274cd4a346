use crate::adapters::server::serve_dashboard;
use crate::adapters::{connect_or_disconnected, LocalStorage};
use crate::core::engine::RefreshEngine;
use crate::core::live_view::LiveView;
use crate::core::pipeline::DashboardPipeline;
use crate::core::ConfigProvider;
use crate::utils::error::{Result, TelemetryError};
use std::net::SocketAddr;
use tokio::net::TcpListener;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub once: bool,
    pub max_cycles: Option<u64>,
    pub monitor: bool,
    /// Serve the latest view over HTTP while refreshing. Ignored with `once`.
    pub serve: Option<SocketAddr>,
}

/// Outcome of a dashboard run, for the binaries to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Refreshed { output_path: String },
    Stopped { completed_cycles: u64 },
}

/// Wires Firebase, local storage and the refresh engine for `config`.
pub async fn run_dashboard<C: ConfigProvider + 'static>(
    config: C,
    options: RunOptions,
) -> Result<RunOutcome> {
    let listener = match options.serve {
        Some(addr) if !options.once => Some(TcpListener::bind(addr).await?),
        Some(_) => {
            tracing::warn!("Ignoring --serve for a single refresh");
            None
        }
        None => None,
    };
    run_dashboard_with_listener(config, options, listener).await
}

/// As [`run_dashboard`], serving on an already bound `listener` when given.
pub async fn run_dashboard_with_listener<C: ConfigProvider + 'static>(
    config: C,
    options: RunOptions,
    listener: Option<TcpListener>,
) -> Result<RunOutcome> {
    let source = connect_or_disconnected(config.source());
    let storage = LocalStorage::new(config.output_path().to_string());
    let interval = config.dashboard().refresh_interval();

    let live_view = LiveView::new();
    let mut pipeline = DashboardPipeline::new(storage, config, source);
    if listener.is_some() {
        pipeline = pipeline.with_live_view(live_view.clone());
    }
    let engine = RefreshEngine::new_with_monitoring(pipeline, options.monitor);

    if options.once {
        let output_path = engine.run_once().await?;
        return Ok(RunOutcome::Refreshed { output_path });
    }

    tracing::info!(
        "⏱️ Refreshing every {:?}{}",
        interval,
        options
            .max_cycles
            .map(|n| format!(" for {} cycles", n))
            .unwrap_or_default()
    );

    let Some(listener) = listener else {
        let completed_cycles = engine.run_periodic(interval, options.max_cycles).await;
        return Ok(RunOutcome::Stopped { completed_cycles });
    };

    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(serve_dashboard(listener, live_view, async {
        let _ = stopped.await;
    }));

    let completed_cycles = engine.run_periodic(interval, options.max_cycles).await;

    let _ = stop.send(());
    server.await.map_err(|e| TelemetryError::Processing {
        message: format!("dashboard server task failed: {}", e),
    })??;

    Ok(RunOutcome::Stopped { completed_cycles })
}
