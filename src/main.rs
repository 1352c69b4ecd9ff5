mod config;
mod delivery;
mod domain;
mod repository;
mod telemetry;
mod transport;
mod usecase;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::delivery::http::v1::admin::{broadcast_notification, list_all_enquiries};
use crate::delivery::http::v1::enquiries::{
    create_enquiry, enquiry_stats, get_enquiry, list_enquiries, list_property_enquiries, respond_to_enquiry,
    update_enquiry_status,
};
use crate::delivery::http::v1::middleware::auth_middleware;
use crate::delivery::http::v1::notifications::{
    delete_notification, get_unread_count, list_notifications, mark_all_as_read, mark_as_read, notification_stats,
};
use crate::repository::postgres::{
    create_pool, PostgresEnquiryRepository, PostgresNotificationRepository, PostgresPropertyRepository,
    PostgresUserRepository,
};
use crate::transport::email::SmtpMailer;
use crate::transport::push::HttpPushTransport;
use crate::transport::queue::{EmailQueue, EmailWorker};
use crate::usecase::broadcast::BroadcastCoordinator;
use crate::usecase::dispatcher::NotificationDispatcher;
use crate::usecase::enquiries::EnquiriesUseCase;
use crate::usecase::jwt::JwtService;
use crate::usecase::notifications::NotificationsUseCase;
use crate::usecase::rate_limiter::RateLimiter;

type Dispatcher = NotificationDispatcher<PostgresNotificationRepository, PostgresUserRepository, HttpPushTransport>;

pub struct AppState {
    pub enquiries_usecase: EnquiriesUseCase<
        PostgresEnquiryRepository,
        PostgresPropertyRepository,
        PostgresUserRepository,
        Arc<Dispatcher>,
    >,
    pub notifications_usecase: NotificationsUseCase<PostgresNotificationRepository>,
    pub broadcast_coordinator: BroadcastCoordinator<PostgresUserRepository, Arc<Dispatcher>>,
    pub jwt_service: JwtService,
    pub metrics_handle: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::AppConfig::from_env().context("failed to load configuration")?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // Initialize tracing subscriber with optional OpenTelemetry layer
    let tracer_provider = if config.telemetry_enabled {
        let telemetry_config = telemetry::TelemetryConfig::from(&config);
        let provider = telemetry::init_telemetry_with_subscriber(&telemetry_config, env_filter)
            .map_err(|e| anyhow::anyhow!("failed to initialize telemetry: {e}"))?;
        Some(provider)
    } else {
        telemetry::init_subscriber_without_telemetry(env_filter);
        None
    };

    tracing::info!("starting the enquiries service");

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    metrics_process::Collector::default().describe();
    tracing::info!("prometheus metrics initialized");

    let pool = create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("failed to create database pool")?;
    tracing::info!("database pool created");

    sqlx::migrate!().run(&pool).await?;
    tracing::info!("database migrations applied");

    let enquiry_repository = PostgresEnquiryRepository::new(pool.clone());
    let property_repository = PostgresPropertyRepository::new(pool.clone());
    let user_repository = PostgresUserRepository::new(pool.clone());
    let notification_repository = PostgresNotificationRepository::new(pool);

    let (email_queue, email_receiver) = EmailQueue::new(config.email_queue_capacity);
    let mailer = SmtpMailer::new(&config.email_settings()).context("failed to configure SMTP mailer")?;
    let email_worker = tokio::spawn(EmailWorker::new(mailer).run(email_receiver));

    let push_transport = HttpPushTransport::new(config.push_gateway_url.clone(), config.push_timeout())
        .context("failed to build push client")?;

    let dispatcher = Arc::new(NotificationDispatcher::new(
        notification_repository.clone(),
        user_repository.clone(),
        push_transport,
        email_queue,
        config.push_timeout(),
    ));

    let dedup_window = config.dedup_window().context("invalid enquiry dedup window")?;
    let enquiries_usecase = EnquiriesUseCase::new(
        enquiry_repository.clone(),
        property_repository,
        user_repository.clone(),
        dispatcher.clone(),
        RateLimiter::new(enquiry_repository, dedup_window),
    )
    .with_event_channel(config.enquiry_event_channel);
    let notifications_usecase = NotificationsUseCase::new(notification_repository);
    let broadcast_coordinator = BroadcastCoordinator::new(user_repository, dispatcher, config.broadcast_concurrency);

    let shared_state = Arc::new(AppState {
        enquiries_usecase,
        notifications_usecase,
        broadcast_coordinator,
        jwt_service: JwtService::new(config.jwt_secret.clone()),
        metrics_handle,
    });

    // All API routes require authentication
    let api = Router::new()
        .route("/api/v1/enquiries", get(list_enquiries).post(create_enquiry))
        .route("/api/v1/enquiries/stats", get(enquiry_stats))
        .route("/api/v1/enquiries/{id}", get(get_enquiry))
        .route("/api/v1/enquiries/{id}/respond", post(respond_to_enquiry))
        .route("/api/v1/enquiries/{id}/status", patch(update_enquiry_status))
        .route("/api/v1/properties/{id}/enquiries", get(list_property_enquiries))
        .route("/api/v1/admin/enquiries", get(list_all_enquiries))
        .route("/api/v1/admin/notifications/broadcast", post(broadcast_notification))
        .route("/api/v1/notifications", get(list_notifications))
        .route("/api/v1/notifications/unread-count", get(get_unread_count))
        .route("/api/v1/notifications/stats", get(notification_stats))
        .route("/api/v1/notifications/read-all", post(mark_all_as_read))
        .route("/api/v1/notifications/{id}/read", post(mark_as_read))
        .route("/api/v1/notifications/{id}", delete(delete_notification))
        .layer(middleware::from_fn_with_state(
            shared_state.clone(),
            auth_middleware,
        ));

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(listen_addr = %config.listen_addr, "enquiries service running");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router owned the last queue handle, so the worker drains and exits.
    if let Err(e) = email_worker.await {
        tracing::error!(error = %e, "email worker task failed");
    }

    if let Some(provider) = tracer_provider {
        telemetry::shutdown_telemetry(provider);
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

async fn metrics(State(state): State<Arc<AppState>>) -> String {
    metrics_process::Collector::default().collect();
    state.metrics_handle.render()
}

#[tracing::instrument]
async fn healthz() -> &'static str {
    "OK"
}
