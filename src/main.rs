use clap::Parser;
use smarthat_telemetry::utils::{logger, validation::Validate};
use smarthat_telemetry::{run_dashboard, CliConfig, RunOptions, RunOutcome};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting smarthat-telemetry");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let options = RunOptions {
        once: config.once,
        max_cycles: config.max_cycles,
        monitor: config.monitor,
        serve: config.serve,
    };
    if options.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    match run_dashboard(config, options).await {
        Ok(RunOutcome::Refreshed { output_path }) => {
            println!("✅ Dashboard refreshed");
            println!("📁 Output saved to: {}", output_path);
        }
        Ok(RunOutcome::Stopped { completed_cycles }) => {
            println!("✅ Stopped after {} refreshes", completed_cycles);
        }
        Err(e) => {
            tracing::error!(
                "❌ Dashboard refresh failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            let exit_code = e.exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
