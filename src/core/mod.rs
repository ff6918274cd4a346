pub mod aggregate;
pub mod engine;
pub mod geo;
pub mod live_view;
pub mod pipeline;

pub use crate::domain::model::TelemetrySnapshot;
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage, TelemetrySource};
pub use crate::domain::view::DashboardView;
pub use crate::utils::error::Result;
