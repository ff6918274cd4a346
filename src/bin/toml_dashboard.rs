use clap::Parser;
use std::net::SocketAddr;
use smarthat_telemetry::adapters::auth::Authenticator;
use smarthat_telemetry::adapters::credentials::{load_service_account, resolve_project_id};
use smarthat_telemetry::adapters::firestore::FirestoreClient;
use smarthat_telemetry::adapters::http::HttpFetcher;
use smarthat_telemetry::adapters::realtime_db::RealtimeDbClient;
use smarthat_telemetry::domain::model::Collection;
use smarthat_telemetry::utils::{logger, validation::Validate};
use smarthat_telemetry::{run_dashboard, RunOptions, RunOutcome, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-dashboard")]
#[command(about = "Smart Hat telemetry dashboard driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "dashboard.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Refresh once and exit
    #[arg(long)]
    once: bool,

    /// Stop after this many refresh cycles
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Serve dashboard.json on this address, overriding [server]
    #[arg(long, conflicts_with = "once")]
    serve: Option<SocketAddr>,

    /// Show what would be polled without contacting Firebase
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if config.monitoring.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting TOML-configured dashboard");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - Firebase will not be contacted");
        perform_dry_run(&config)?;
        return Ok(());
    }

    let options = RunOptions {
        once: args.once,
        max_cycles: args.max_cycles,
        monitor: args.monitor.unwrap_or_else(|| config.monitoring_enabled()),
        serve: match args.serve {
            Some(addr) => Some(addr),
            None => config.server.serve_address()?,
        },
    };

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

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Deployment: {}", config.deployment.name);
    if !config.deployment.description.is_empty() {
        println!("  Description: {}", config.deployment.description);
    }
    println!("  Realtime DB: {}", config.source.database_url);
    println!(
        "  Project: {}",
        config
            .source
            .project_id
            .as_deref()
            .unwrap_or("(from credentials)")
    );
    println!("  Output: {}", config.load.output_path);
    println!(
        "  Refresh: every {}s",
        config.dashboard.refresh_interval_secs
    );
    println!("  Export archive: {}", config.load.export_archive);

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) -> anyhow::Result<()> {
    let source = &config.source;
    let fetcher = HttpFetcher::new(source)?;
    let account = load_service_account(&source.credentials_env);
    let auth = Authenticator::select(source.resolved_auth_token(), account.as_ref(), &fetcher)?;

    println!("🔍 Dry Run Analysis:");
    println!();
    println!("📡 Endpoints that would be polled:");

    let realtime_db = RealtimeDbClient::new(fetcher.clone(), &source.database_url, auth.clone());
    println!(
        "  {} -> {}",
        Collection::Detections,
        realtime_db.path_url(Collection::Detections.remote_name())
    );

    match resolve_project_id(source.project_id.as_deref(), account.as_ref()) {
        Ok(project_id) => {
            let firestore = FirestoreClient::new(
                fetcher,
                &source.firestore_base_url,
                &project_id,
                auth.clone(),
                source.fetch_page_size,
            );
            for collection in Collection::ALL
                .iter()
                .filter(|c| **c != Collection::Detections)
            {
                println!(
                    "  {} -> {}",
                    collection,
                    firestore.collection_url(collection.remote_name())
                );
            }
        }
        Err(e) => {
            println!("  ⚠️ Firestore collections unavailable: {}", e);
            println!("  💡 {}", e.recovery_suggestion());
        }
    }

    println!();
    println!("🔐 Authentication: {}", auth.describe());
    if let Some(addr) = config.server.serve_address()? {
        println!("🌐 Would serve dashboard at http://{}/dashboard.json", addr);
    }
    println!(
        "🧮 Alerts: battery <= {}%, temperature >= {}°C",
        config.dashboard.battery_alert_percent, config.dashboard.temperature_alert_celsius
    );
    println!();
    println!("✅ Dry run analysis complete.");

    Ok(())
}
