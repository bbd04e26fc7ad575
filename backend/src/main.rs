use axum::http::{header, HeaderValue, Method};
use axum::Router;
use redis::Client as RedisClient;
use shared::shared_wheel_game::{SpinOutcomeGenerator, Symbol};
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::games::backend_wheel_game::create_router as create_wheel_game_router;
use crate::services::prize_ledger::{PgPrizeStore, PrizeLedger};
use crate::services::spin_session::RedisSessionStore;
use crate::services::wheel_controller::{WheelConfig, WheelController};
use crate::services::winner_notifier::SmtpWinnerNotifier;

mod auth;
mod games;
mod logging;
mod services;

#[derive(Clone)]
pub struct AppState {
    wheel: Arc<WheelController>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::setup();
    dotenvy::from_path(".env").ok();

    let pool = PgPool::connect_with(
        std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set")
            .parse::<sqlx::postgres::PgConnectOptions>()?
            .to_owned(),
    )
    .await
    .expect("Failed to create pool");

    sqlx::migrate!().run(&pool).await?;

    let redis = RedisClient::open(
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
    )
    .expect("Failed to connect to Redis");

    // Alphabet size is validated here so a bad configuration kills the
    // process instead of surfacing mid-spin.
    let generator = SpinOutcomeGenerator::new(Symbol::ALL.to_vec())?;

    let notifier = SmtpWinnerNotifier::new(
        std::env::var("NOTIFY_FROM_ADDRESS")
            .unwrap_or_else(|_| "wheel@ambassadors.example".to_string()),
        std::env::var("PRIZE_INBOX").expect("PRIZE_INBOX must be set"),
    );

    let wheel = Arc::new(WheelController::new(
        PrizeLedger::new(Arc::new(PgPrizeStore::new(pool))),
        Arc::new(RedisSessionStore::new(redis)),
        Arc::new(notifier),
        generator,
        WheelConfig::default(),
    ));

    let state = AppState { wheel };

    let frontend_url =
        std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let cors = CorsLayer::new()
        .allow_origin(frontend_url.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let app = Router::new()
        .nest("/api/wheel", create_wheel_game_router())
        .layer(cors)
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    let listener = TcpListener::bind(addr).await?;
    info!("Wonder wheel service listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
