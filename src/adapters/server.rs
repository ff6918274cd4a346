use crate::core::live_view::LiveView;
use crate::core::pipeline::DASHBOARD_FILE;
use crate::utils::error::Result;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::future::Future;
use tokio::net::TcpListener;

/// Routes: `GET /dashboard.json` (latest view) and `GET /health`.
pub fn dashboard_routes(live_view: LiveView) -> Router {
    Router::new()
        .route(&format!("/{}", DASHBOARD_FILE), get(latest_dashboard))
        .route("/health", get(health))
        .with_state(live_view)
}

async fn latest_dashboard(State(live_view): State<LiveView>) -> Response {
    match live_view.latest().await {
        Some(published) => (
            [
                (header::CONTENT_TYPE, "application/json".to_string()),
                (header::CACHE_CONTROL, "no-store".to_string()),
                (
                    header::LAST_MODIFIED,
                    published.generated_at.to_rfc2822(),
                ),
            ],
            published.json.to_string(),
        )
            .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"message": "Dashboard has not been refreshed yet"})),
        )
            .into_response(),
    }
}

async fn health(State(live_view): State<LiveView>) -> Json<serde_json::Value> {
    let last_refresh = live_view
        .latest()
        .await
        .map(|published| published.generated_at.to_rfc3339());
    Json(json!({"status": "ok", "last_refresh": last_refresh}))
}

/// Serves [`dashboard_routes`] on `listener` until `shutdown` resolves.
pub async fn serve_dashboard<F>(listener: TcpListener, live_view: LiveView, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!("🌐 Serving dashboard at http://{}/{}", addr, DASHBOARD_FILE);
    axum::serve(listener, dashboard_routes(live_view))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("🌐 Dashboard server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    async fn spawn_server(live_view: LiveView) -> (String, tokio::sync::oneshot::Sender<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(serve_dashboard(listener, live_view, async {
            let _ = stopped.await;
        }));
        (base, stop)
    }

    #[tokio::test]
    async fn test_dashboard_unavailable_before_first_refresh() {
        let (base, _stop) = spawn_server(LiveView::new()).await;

        let response = reqwest::get(format!("{}/dashboard.json", base)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);

        let health: serde_json::Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");
        assert!(health["last_refresh"].is_null());
    }

    #[tokio::test]
    async fn test_dashboard_serves_latest_publish() {
        let live_view = LiveView::new();
        let generated_at = Utc.timestamp_opt(1_709_294_400, 0).unwrap();
        live_view
            .publish(br#"{"status":{"state":"connected"}}"#, generated_at)
            .await;
        let (base, _stop) = spawn_server(live_view).await;

        let response = reqwest::get(format!("{}/dashboard.json", base)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(
            response.headers()[reqwest::header::CONTENT_TYPE],
            "application/json"
        );
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"]["state"], "connected");
    }
}
