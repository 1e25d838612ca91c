use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use application::{
    CommandListener, DurationRecorder, LoggingActionDispatcher, OutputManager, OutputRuntime,
    TriggerEvaluator,
};
use domain::clock::{Clock, SystemClock};
use domain::trigger::{ActionDispatcher, TriggerRuleRepository};
use infrastructure::config::DaemonConfig;
use infrastructure::database;
use infrastructure::{
    DriverFactory, MqttActionDispatcher, MqttClient, SqliteMeasurementStore,
    SqliteTriggerRuleRepository,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config directory
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// Override daemon ID
    #[arg(long)]
    daemon_id: Option<String>,

    /// Override MQTT host (enables MQTT if not configured)
    #[arg(long)]
    mqtt_host: Option<String>,

    /// Override MQTT port
    #[arg(long)]
    mqtt_port: Option<u16>,
}

async fn run() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,output_daemon=debug,application=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🔧 Output daemon starting...");
    info!("🆔 Process ID: {}", std::process::id());

    let args = Args::parse();

    // 1. Configuration
    info!(config_dir = %args.config_dir, "Loading configuration...");
    let mut config = DaemonConfig::load(&args.config_dir)?;

    if let Some(id) = args.daemon_id {
        config.daemon_id = id;
    }
    if let Some(host) = args.mqtt_host {
        let port = args
            .mqtt_port
            .or(config.mqtt.as_ref().map(|m| m.port))
            .unwrap_or(1883);
        config.mqtt = Some(infrastructure::config::MqttConfig { host, port });
    } else if let (Some(port), Some(mqtt)) = (args.mqtt_port, config.mqtt.as_mut()) {
        mqtt.port = port;
    }

    let daemon_id = config.daemon_id.clone();
    info!("✅ Loaded configuration for daemon: {}", daemon_id);

    // 2. Storage
    info!("💾 Connecting to storage: {}", config.storage.database_url);
    let pool = database::connect(&config.storage.database_url).await?;
    let rules = Arc::new(SqliteTriggerRuleRepository::new(pool.clone()).await?);
    let store = Arc::new(SqliteMeasurementStore::new(pool).await?);

    for rule in &config.triggers {
        if let Err(e) = rules.save(rule).await {
            warn!(rule_id = %rule.id, error = %e, "Failed to seed trigger rule");
        }
    }
    info!(count = config.triggers.len(), "✅ Trigger rules seeded");

    // 3. Messaging
    let mqtt_client = match &config.mqtt {
        Some(mqtt) => {
            info!(host = %mqtt.host, port = %mqtt.port, "Connecting to MQTT broker...");
            let client =
                MqttClient::new(&mqtt.host, mqtt.port, &format!("outputs-{}", daemon_id)).await?;
            Some(client)
        }
        None => {
            info!("MQTT not configured; trigger actions will only be logged");
            None
        }
    };

    let dispatcher: Arc<dyn ActionDispatcher> = match &mqtt_client {
        Some(client) => Arc::new(MqttActionDispatcher::new(Arc::new(client.clone()))),
        None => Arc::new(LoggingActionDispatcher),
    };

    // 4. Outputs
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (recorder, workers) = DurationRecorder::start(
        store,
        config.recorder.queue_capacity,
        config.recorder.workers,
    );
    let evaluator = Arc::new(TriggerEvaluator::new(rules, dispatcher, clock.clone()));
    let manager = Arc::new(OutputManager::new(workers));

    for (output, driver_config) in config.outputs()? {
        let output_id = output.id.clone();
        let driver = DriverFactory::create_driver(&driver_config);
        let runtime = OutputRuntime::new(
            output,
            driver,
            recorder.clone(),
            evaluator.clone(),
            clock.clone(),
        );

        if let Err(e) = manager.register(runtime).await {
            error!(output_id = %output_id, driver = driver_config.as_str(), error = %e, "Failed to set up output");
        }
    }
    info!(count = manager.output_ids().len(), "✅ Outputs ready");

    manager
        .start_expiry_watcher(Duration::from_millis(config.expiry_check_ms))
        .await;

    // 5. Command ingress
    let cancel_token = CancellationToken::new();
    let listener_handle = mqtt_client.clone().map(|client| {
        let listener = CommandListener::new(client, daemon_id.clone(), manager.clone());
        let token = cancel_token.clone();
        tokio::spawn(async move {
            listener.start(token).await;
        })
    });

    // 6. Shutdown signal
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("🛑 Shutting down..."),
        Err(err) => warn!(error = %err, "Unable to listen for shutdown signal"),
    }

    cancel_token.cancel();
    if let Some(handle) = listener_handle {
        if let Err(e) = handle.await {
            error!(error = %e, "Command listener panicked");
        }
    }

    manager.shutdown_all().await;

    if let Some(client) = mqtt_client {
        let _ = client.disconnect().await;
    }

    info!("👋 Good bye!");
    Ok(())
}

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("❌ Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run()) {
        eprintln!("\n❌ CRITICAL ERROR: {:?}", e);
        std::process::exit(1);
    }
}
