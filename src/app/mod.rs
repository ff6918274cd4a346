pub mod runner;

pub use runner::{run_dashboard, run_dashboard_with_listener, RunOptions, RunOutcome};
