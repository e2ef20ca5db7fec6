use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use tokio::sync::mpsc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use storefront_api::{
    app_router,
    auth::{AuthConfig, AuthService},
    build_state, config, db,
    events::{process_events, EventSender},
    notifications::{Notifier, WebhookNotifier},
};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);
    info!(environment = %cfg.environment, "starting storefront-api");

    let db = Arc::new(db::establish_connection_from_app_config(&cfg).await?);
    if cfg.auto_migrate {
        db::run_migrations(&db).await?;
    }

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let notifier: Option<Arc<dyn Notifier>> = cfg
        .notification_endpoint
        .clone()
        .map(|endpoint| Arc::new(WebhookNotifier::new(endpoint)) as Arc<dyn Notifier>);
    if notifier.is_none() {
        warn!("no notification endpoint configured; login codes will not be delivered");
    }
    tokio::spawn(process_events(rx, notifier));
    let event_sender = EventSender::new(tx);

    let auth = Arc::new(AuthService::new(
        AuthConfig::new(
            cfg.jwt_secret.clone(),
            Duration::from_secs(cfg.jwt_expiration_secs),
            Duration::from_secs(cfg.otp_ttl_secs),
        ),
        db.clone(),
        event_sender.clone(),
    ));

    let state = build_state(db, auth, event_sender);
    let app = app_router(state).layer(cors_layer(&cfg));

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shut down cleanly");
    Ok(())
}

fn cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    match &cfg.cors_allowed_origins {
        Some(origins) => {
            let parsed: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|origin| {
                    let origin = origin.trim();
                    match origin.parse() {
                        Ok(value) => Some(value),
                        Err(_) => {
                            warn!(origin, "ignoring unparseable CORS origin");
                            None
                        }
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(parsed))
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None if cfg.is_development() => CorsLayer::permissive(),
        None => CorsLayer::new(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c"),
        _ = terminate => info!("received terminate signal"),
    }
}
