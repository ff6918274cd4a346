pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::cli::CliConfig;
pub use crate::config::toml_config::TomlConfig;

pub use crate::adapters::{DisconnectedSource, FirebaseSource, LocalStorage};
pub use crate::app::{run_dashboard, run_dashboard_with_listener, RunOptions, RunOutcome};
pub use crate::core::{engine::RefreshEngine, live_view::LiveView, pipeline::DashboardPipeline};
pub use crate::utils::error::{Result, TelemetryError};
