use sea_orm::Database;
use tracing::info;

use campus_core::config::Config;
use campus_core::tracing::init_tracing;
use campus_enrollments::config::EnrollmentsConfig;
use campus_enrollments::router::build_router;
use campus_enrollments::state::AppState;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = EnrollmentsConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let state = AppState::new(db, config.jwt_secret);

    let router = build_router(state);
    let http_addr = format!("0.0.0.0:{}", config.enrollments_port);
    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .expect("failed to bind");

    info!("enrollments service listening on {http_addr}");
    axum::serve(listener, router).await.expect("server error");
}
