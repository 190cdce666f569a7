mod clock;
mod config;
mod error;
mod http;
mod identity;
mod model;
mod notify;
mod queue;
mod store;
mod telemetry;

use std::collections::BTreeSet;
use std::sync::Arc;

use mimalloc::MiMalloc;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use clock::{Clock, SystemClock};
use config::Config;
use http::AppContext;
use identity::TokenService;
use notify::Notifier;
use queue::{Engine, EngineSettings};
use store::{Store, StoreConfig};

const DEFAULT_HTTP_PORT: u16 = 7410;
const DRAIN_TIMEOUT_SECS: u64 = 10;

/// Create a shutdown signal handler.
async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                warn!(error = %e, "Failed to install Ctrl+C handler, continuing without it");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler, continuing without it");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
    let _ = shutdown_tx.send(());
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();

    let config = Config::from_env();

    let store = Arc::new(Store::open(StoreConfig {
        uri: config.store_uri.clone(),
        wal_mode: true,
    })?);
    store.migrate()?;

    if config.seed_demo {
        seed_demo(&store)?;
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let notifier = Notifier::start(config.notifier_url.clone());
    let engine = Engine::new(
        Arc::clone(&store),
        Arc::clone(&clock),
        Arc::clone(&notifier),
        EngineSettings::from(&config),
    );

    let state = Arc::new(AppContext {
        engine,
        tokens: TokenService::new(&config.session_secret, config.token_ttl_seconds),
        clock,
    });

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let shutdown_tx_signal = shutdown_tx.clone();
    tokio::spawn(async move {
        shutdown_signal(shutdown_tx_signal).await;
    });

    let http_port = std::env::var("HTTP_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_HTTP_PORT);
    if http_port == 0 {
        error!(port = http_port, "Invalid HTTP port, must be 1-65535");
        std::process::exit(1);
    }

    let router = http::create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", http_port)).await?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = http_port,
        endpoint = %format!("http://0.0.0.0:{}", http_port),
        "lineup server ready"
    );

    let mut shutdown_rx = shutdown_tx.subscribe();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;

    // Flush outstanding notifications before exit.
    info!("Draining notification queue...");
    notifier
        .drain(std::time::Duration::from_secs(DRAIN_TIMEOUT_SECS))
        .await;

    info!("Shutdown complete");
    Ok(())
}

/// Seed a small demo business for local development.
fn seed_demo(store: &Store) -> error::Result<()> {
    use model::{Business, Gender, Helper, HelperStatus, Service, UserRecord};

    store.with_tx(|tx| {
        store::businesses::put(
            tx,
            &Business {
                id: "demo-business".to_string(),
                owner_id: "demo-owner".to_string(),
                active: true,
                timezone: "UTC".to_string(),
                deleted: false,
                suspended: false,
                helpers: vec![
                    Helper {
                        helper_id: "demo-helper-1".to_string(),
                        status: HelperStatus::Accepted,
                        active: true,
                        services: BTreeSet::from(["demo-haircut".to_string()]),
                    },
                    Helper {
                        helper_id: "demo-helper-2".to_string(),
                        status: HelperStatus::Accepted,
                        active: true,
                        services: BTreeSet::from(["demo-haircut".to_string()]),
                    },
                ],
            },
        )?;
        store::services::put(
            tx,
            &Service {
                id: "demo-haircut".to_string(),
                business_id: "demo-business".to_string(),
                name: "Haircut".to_string(),
                duration_minutes: 30,
                price: 25.0,
                allowed_genders: BTreeSet::from([Gender::Male, Gender::Female, Gender::Child]),
                deleted: false,
            },
        )?;
        store::customers::put_user(
            tx,
            &UserRecord {
                id: "demo-user".to_string(),
                push_token: None,
                receive_notifications: true,
                gender: Gender::Male,
                active: true,
                deleted: false,
                suspended: false,
            },
        )?;
        Ok(())
    })?;

    info!("demo data seeded");
    Ok(())
}
