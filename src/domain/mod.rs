// Domain layer: telemetry models, the dashboard view model and ports.

pub mod model;
pub mod ports;
pub mod view;
