pub mod config;
pub mod db;
pub mod dto;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod service;

use std::env;
use std::io;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use log::{info, warn};
use sqlx::{postgres::Postgres, Pool};

use config::AppConfig;
use db::{init_db_pool, memory::MemoryStore, PgStore};
use service::auth::AuthMiddleware;
use service::clock::SystemClock;
use service::log::{init_logger, LoggerMiddleware};
use service::user::TokenSettings;
use service::AppState;

type PGPool = Pool<Postgres>;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    init_logger(&env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()));

    let cfg = AppConfig::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    info!("starting in {} mode (log level {})", cfg.app_env, cfg.log_level);

    let tokens = TokenSettings {
        secret: cfg.jwt_secret.clone(),
        ttl_secs: cfg.jwt_ttl_secs,
    };
    let state = match &cfg.database_url {
        Some(db_url) => {
            let pool: PGPool = init_db_pool(db_url, cfg.db_max_connections)
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            info!("connected to postgres, migrations applied");
            AppState::new(PgStore::new(pool), tokens, Arc::new(SystemClock))
        }
        None => {
            warn!("DATABASE_URL is not set, data lives in memory only");
            AppState::new(MemoryStore::new(), tokens, Arc::new(SystemClock))
        }
    };
    let state = web::Data::new(state);
    let secret = cfg.jwt_secret.clone();

    info!("listening on http://{}:{}", cfg.host, cfg.port);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(AuthMiddleware::new(&secret))
            .wrap(LoggerMiddleware)
            .configure(handlers::init_routes)
    })
    .bind((cfg.host.as_str(), cfg.port))?
    .run()
    .await
}
