mod core;
mod features;
mod shared;

use crate::core::config::Config;
use crate::core::openapi::ApiDoc;
use crate::core::{database, middleware};
use crate::features::ambulances::stores::{
    AmbulanceStore, InMemoryAmbulanceStore, PgAmbulanceStore,
};
use crate::features::ambulances::{routes as ambulances_routes, DispatchMatcher, ResourceRegistry};
use crate::features::auth;
use crate::features::auth::routes as auth_routes;
use crate::features::bookings::stores::{BookingStore, InMemoryBookingStore, PgBookingStore};
use crate::features::bookings::{routes as bookings_routes, BookingService, DispatchRetryWorker};
use crate::features::notifications::stores::{
    InMemoryNotificationStore, NotificationStore, PgNotificationStore,
};
use crate::features::notifications::{
    routes as notifications_routes, ChannelNotificationSink, NotificationService,
    NotificationWorker,
};
use crate::features::tracking::{routes as tracking_routes, TrackingHub, TrackingService};
use axum::{routing::get, Json, Router};
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

/// Persistence backends for every store the dispatch core owns
struct Stores {
    ambulances: Arc<dyn AmbulanceStore>,
    bookings: Arc<dyn BookingStore>,
    notifications: Arc<dyn NotificationStore>,
}

impl Stores {
    fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            ambulances: Arc::new(PgAmbulanceStore::new(pool.clone())),
            bookings: Arc::new(PgBookingStore::new(pool.clone())),
            notifications: Arc::new(PgNotificationStore::new(pool)),
        }
    }

    fn in_memory() -> Self {
        Self {
            ambulances: Arc::new(InMemoryAmbulanceStore::new()),
            bookings: Arc::new(InMemoryBookingStore::new()),
            notifications: Arc::new(InMemoryNotificationStore::new()),
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "System info: tokio_worker_threads={}, pid={}",
        worker_threads,
        std::process::id()
    );
    tracing::info!("Configuration loaded successfully");

    let stores = match &config.database {
        Some(db_config) => {
            let pool = database::create_pool(db_config).await?;
            tracing::info!("Database connection pool created");

            tracing::info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
            tracing::info!("Database migrations completed successfully");

            Stores::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, running on in-memory stores");
            Stores::in_memory()
        }
    };

    let jwt_validator = Arc::new(auth::JwtValidator::new(
        &config.auth.secret,
        config.auth.issuer.clone(),
        config.auth.audience.clone(),
        config.auth.jwt_leeway,
    ));
    tracing::info!("Auth configuration initialized");

    // Notification fan-out: producers enqueue, one worker persists
    let (notification_sink, notification_rx) =
        ChannelNotificationSink::channel(config.dispatch.notification_queue_capacity);
    let notification_sink = Arc::new(notification_sink);
    let notification_worker =
        NotificationWorker::new(Arc::clone(&stores.notifications), notification_rx);
    tokio::spawn(async move {
        notification_worker.run().await;
    });
    tracing::info!("Notification worker spawned");

    let notification_service = Arc::new(NotificationService::new(Arc::clone(
        &stores.notifications,
    )));

    let registry = Arc::new(ResourceRegistry::new(
        Arc::clone(&stores.ambulances),
        notification_sink.clone(),
    ));
    let matcher = Arc::new(DispatchMatcher::new(Arc::clone(&registry)));
    let tracking_hub = Arc::new(TrackingHub::new(config.dispatch.tracking_channel_capacity));
    let booking_service = Arc::new(
        BookingService::new(
            Arc::clone(&stores.bookings),
            Arc::clone(&registry),
            matcher,
            notification_sink,
        )
        .with_tracking(Arc::clone(&tracking_hub)),
    );
    tracing::info!("Dispatch services initialized");

    let tracking_service = Arc::new(TrackingService::new(
        tracking_hub,
        Arc::clone(&booking_service),
        Arc::clone(&registry),
    ));
    tracing::info!("Tracking service initialized");

    let retry_worker = DispatchRetryWorker::new(
        Arc::clone(&booking_service),
        config.dispatch.retry_interval,
        config.dispatch.retry_batch_size,
    );
    tokio::spawn(async move {
        retry_worker.run().await;
    });
    tracing::info!("Dispatch retry worker spawned");

    // Protected routes (require JWT authentication)
    let protected_routes = Router::new()
        .merge(auth_routes::protected_routes())
        .merge(ambulances_routes::routes(Arc::clone(&registry)))
        .merge(ambulances_routes::admin_routes(registry))
        .merge(bookings_routes::routes(booking_service))
        .merge(tracking_routes::routes(tracking_service))
        .merge(notifications_routes::routes(notification_service))
        .route_layer(axum::middleware::from_fn_with_state(
            jwt_validator,
            middleware::auth_middleware,
        ));

    // Simple health check endpoint (no auth required)
    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }

    let openapi = ApiDoc::openapi();
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { Json(openapi) }),
        );

    let app = Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nodelay(true)?;

    // Long-lived SSE tracking streams rely on keepalive to detect dead peers
    let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
    socket.set_tcp_keepalive(&keepalive)?;

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
