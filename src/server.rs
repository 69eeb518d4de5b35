use crate::api;
use crate::config::{Config, CONFIG_FILE};
use crate::error::Result;
use crate::notifier::{Debouncer, NotificationWindow};
use crate::probe::PingProber;
use crate::scanner::{Scanner, ScannerOptions};
use crate::settings::{self, SettingsStore};
use crate::status_log::DeviceLog;
use crate::storage::JsonFileStore;
use crate::transport::TelegramTransport;
use crate::utils::{Clock, LocalClock};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// State shared by the HTTP handlers.
pub struct AppState {
    pub scanner: Arc<Scanner>,
    pub settings: Arc<SettingsStore>,
}

impl AppState {
    #[must_use]
    pub fn new(scanner: Arc<Scanner>, settings: Arc<SettingsStore>) -> Self {
        Self { scanner, settings }
    }

    /// Wire the production components described by `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(LocalClock);
        let settings = Arc::new(SettingsStore::load(JsonFileStore::new(
            &config.settings_file,
        )));

        if config.telegram.bot_token.is_none() || config.telegram.chat_id.is_none() {
            tracing::warn!("Telegram credentials missing; notifications will not be delivered");
        }
        let debouncer = Debouncer::new(
            Arc::new(TelegramTransport::new(&config.telegram)),
            Arc::clone(&clock),
            settings.enabled_fn(),
            Duration::from_secs(config.notifications.debounce_interval_secs),
            NotificationWindow::new(
                config.notifications.start_hour,
                config.notifications.end_hour,
            ),
        );

        let log_store = JsonFileStore::new(&config.device_log_file);
        let initial_log: DeviceLog = log_store.load_or_set_aside();

        let scanner = Scanner::new(
            config.devices.clone(),
            initial_log,
            Arc::new(PingProber::default()),
            Arc::new(debouncer),
            Arc::new(log_store),
            clock,
            ScannerOptions {
                probe_timeout: config.probe_timeout(),
                debug: config.debug,
                repeat_same_status: config.notifications.repeat_same_status,
            },
        );

        Self::new(Arc::new(scanner), settings)
    }
}

/// Build the API router, serving `static_dir` for every other path when it exists.
pub fn router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let mut app = Router::new()
        .route("/devices", get(api::list_devices))
        .route("/status", get(api::get_status))
        .route("/uptime/:ip/:date", get(api::get_uptime))
        .route("/weekly/:ip", get(api::get_weekly))
        .route(
            "/notifications",
            get(settings::get_notifications).post(settings::set_notifications),
        )
        .with_state(state);

    if let Some(dir) = static_dir.filter(|dir| dir.is_dir()) {
        tracing::debug!("Serving static files from {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Load configuration and run the server until `cancel_token` is cancelled.
///
/// # Arguments
///
/// * `port` - Overrides the configured port when set
/// * `config_path` - Configuration file, `config.json5` when `None`
/// * `cancel_token` - Cancelling it stops the scan loop and the server
///
/// # Errors
///
/// Returns an error if:
/// - The configuration cannot be loaded or is invalid
/// - The server fails to bind to the requested address
pub async fn run(
    port: Option<u16>,
    config_path: Option<PathBuf>,
    cancel_token: CancellationToken,
) -> Result<()> {
    tracing::info!("Initializing server");

    let config_path = config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let mut config = Config::load(&config_path)?;
    config.apply_env(|key| std::env::var(key).ok());
    if let Some(port) = port {
        config.port = port;
    }

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    tracing::info!("Binding server to address: {addr}");
    let listener = TcpListener::bind(addr).await?;

    serve(listener, &config, cancel_token).await
}

/// Run the scan loop and serve the API on an already bound listener.
///
/// # Errors
///
/// Returns an error if the server stops with an I/O failure
pub async fn serve(
    listener: TcpListener,
    config: &Config,
    cancel_token: CancellationToken,
) -> Result<()> {
    let state = Arc::new(AppState::from_config(config));

    if config.debug {
        tracing::warn!("Debug mode enabled; devices will not be scanned");
    }
    let scan_loop = tokio::spawn(
        Arc::clone(&state.scanner).run(config.scan_interval(), cancel_token.clone()),
    );

    let app = router(state, Some(config.static_dir.as_path()));
    tracing::info!("Site launched on: http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel_token.cancelled().await })
        .await?;

    if let Err(e) = scan_loop.await {
        tracing::error!("Scan loop ended abnormally: {e}");
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}
