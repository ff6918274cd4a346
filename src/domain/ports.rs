use crate::config::{DashboardSettings, SourceSettings};
use crate::domain::model::TelemetrySnapshot;
use crate::domain::view::DashboardView;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn source(&self) -> &SourceSettings;
    fn dashboard(&self) -> &DashboardSettings;
    fn output_path(&self) -> &str;
    fn export_archive(&self) -> bool;
}

/// Where telemetry comes from.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<TelemetrySnapshot>;
    fn is_connected(&self) -> bool;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<TelemetrySnapshot>;
    async fn transform(&self, snapshot: TelemetrySnapshot) -> Result<DashboardView>;
    async fn load(&self, view: DashboardView) -> Result<String>;
}
