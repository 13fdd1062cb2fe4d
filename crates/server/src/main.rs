//! Receptionist Server Entry Point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use receptionist_agent::SessionTable;
use receptionist_config::{load_settings, Settings};
use receptionist_core::CallRecordStore;
use receptionist_persistence::{InMemoryCallLogStore, ScyllaConfig};
use receptionist_server::{create_router, init_metrics, unconfigured_services, AppState};
use receptionist_tools::create_receptionist_registry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
    let env = std::env::var("RECEPTIONIST_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => {
            // Tracing not yet initialized
            eprintln!(
                "Loaded configuration from files (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        },
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        },
    };

    init_tracing(&config);

    tracing::info!("Starting Receptionist Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        config_path = env.as_deref().unwrap_or("default"),
        business = %config.business.company_name,
        "Configuration loaded"
    );

    let metrics_handle = if config.observability.metrics_enabled {
        match init_metrics() {
            Ok(handle) => {
                tracing::info!("Initialized Prometheus metrics at /metrics");
                Some(handle)
            },
            Err(e) => {
                tracing::warn!(error = %e, "Metrics disabled");
                None
            },
        }
    } else {
        None
    };

    let call_log = init_call_log(&config).await;

    let tools = Arc::new(create_receptionist_registry(
        &config.business,
        Duration::from_millis(config.turn.tool_timeout_ms),
    ));
    tracing::info!(tools = ?tools.tool_names(), "Registered receptionist tools");

    let sessions = Arc::new(SessionTable::from_settings(
        &config,
        unconfigured_services(call_log.clone()),
        Arc::clone(&tools),
    ));

    let mut state = AppState::new(config.clone(), Arc::clone(&sessions), tools, call_log);
    if let Some(handle) = metrics_handle {
        state = state.with_metrics(handle);
    }

    tracing::info!(
        call_log = state.has_call_log(),
        max_sessions = sessions.max_sessions(),
        "Initialized application state"
    );

    let app = create_router(state);

    let host: std::net::IpAddr = config.server.host.parse().unwrap_or_else(|e| {
        tracing::warn!(host = %config.server.host, error = %e, "Invalid host, binding 0.0.0.0");
        std::net::IpAddr::from([0, 0, 0, 0])
    });
    let addr = SocketAddr::new(host, config.server.port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let finalized = sessions.shutdown_all().await;
    tracing::info!(finalized, "Server shutdown complete");

    Ok(())
}

/// Pick the call log gateway
///
/// ScyllaDB when enabled. Development runs without a cluster keep records
/// in memory; strict environments run without a gateway.
async fn init_call_log(config: &Settings) -> Option<Arc<dyn CallRecordStore>> {
    if config.persistence.enabled {
        tracing::info!("Initializing ScyllaDB persistence layer...");
        match receptionist_persistence::init(ScyllaConfig::from_settings(&config.persistence)).await
        {
            Ok(persistence) => {
                tracing::info!(
                    hosts = ?config.persistence.scylla_hosts,
                    keyspace = %config.persistence.keyspace,
                    "ScyllaDB persistence initialized"
                );
                Some(Arc::new(persistence.call_logs) as Arc<dyn CallRecordStore>)
            },
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Failed to initialize ScyllaDB, call records will not be stored"
                );
                None
            },
        }
    } else if config.environment.is_strict() {
        tracing::warn!("Persistence disabled, call records will not be stored");
        None
    } else {
        tracing::info!("Persistence disabled, keeping call records in memory");
        Some(Arc::new(InMemoryCallLogStore::new()) as Arc<dyn CallRecordStore>)
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("receptionist={},tower_http=debug", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    subscriber.with(fmt_layer).init();
}
