use crate::config::{DashboardSettings, SourceSettings};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, Validate};
use clap::Parser;
use std::net::SocketAddr;

#[derive(Debug, Clone, Parser)]
#[command(name = "smarthat-telemetry")]
#[command(about = "Telemetry dashboard backend for the Smart Hat navigation aid")]
pub struct CliConfig {
    #[command(flatten)]
    pub source: SourceSettings,

    #[command(flatten)]
    pub dashboard: DashboardSettings,

    #[arg(long, default_value = "./dashboard")]
    pub output_path: String,

    #[arg(long, help = "Also write telemetry_export.zip with CSV tables")]
    pub export_archive: bool,

    #[arg(long, help = "Refresh once and exit")]
    pub once: bool,

    #[arg(long, help = "Stop after this many refresh cycles")]
    pub max_cycles: Option<u64>,

    #[arg(
        long,
        conflicts_with = "once",
        help = "Serve dashboard.json over HTTP on this address, e.g. 0.0.0.0:8050"
    )]
    pub serve: Option<SocketAddr>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log process CPU and memory after each phase")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl ConfigProvider for CliConfig {
    fn source(&self) -> &SourceSettings {
        &self.source
    }

    fn dashboard(&self) -> &DashboardSettings {
        &self.dashboard
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn export_archive(&self) -> bool {
        self.export_archive
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        self.source.validate()?;
        self.dashboard.validate()?;
        validate_path("output_path", &self.output_path)?;
        Ok(())
    }
}
