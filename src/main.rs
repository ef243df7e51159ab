use {
    axum::http::HeaderValue,
    seeds_api::{
        AppState,
        adapters::paypal::PayPalGateway,
        config::Config,
        domain::{gateway::PaymentGateway, store::RecordStore},
        infra::postgres::PgRecordStore,
        services::{
            lifecycle::LifecycleController,
            mailer::{Mailer, NullMailer, SmtpMailer},
        },
    },
    sqlx::postgres::PgPoolOptions,
    std::{sync::Arc, time::Duration},
    tokio::signal,
    tower_http::{
        cors::{AllowOrigin, Any, CorsLayer},
        timeout::TimeoutLayer,
    },
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("invalid configuration");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("failed to run migrations");

    let store: Arc<dyn RecordStore> = Arc::new(PgRecordStore::new(pool));
    let gateway: Arc<dyn PaymentGateway> =
        Arc::new(PayPalGateway::new(config.paypal.clone()).expect("paypal client"));
    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::from_config(smtp).expect("smtp transport")),
        None => Arc::new(NullMailer),
    };

    let controller = Arc::new(LifecycleController::new(
        store.clone(),
        gateway.clone(),
        config.frontend_base_url.clone(),
        config.paypal.brand_name.clone(),
    ));

    let state = AppState {
        controller,
        store,
        gateway,
        mailer,
        org_name: config.paypal.brand_name.clone(),
        admin_email: config.smtp.as_ref().map(|s| s.admin_email.clone()),
        send_user_confirmation: config
            .smtp
            .as_ref()
            .is_some_and(|s| s.send_user_confirmation),
    };

    let app = seeds_api::app(state)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors_layer(&config.cors_origins));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .expect("failed to bind listener");
    tracing::info!(port = config.port, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    if parsed.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(parsed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
