pub mod auth;
pub mod event;
pub mod user;

use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "OK",
        "timestamp": Utc::now(),
    }))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(
        web::scope("/api")
            .service(web::scope("/auth").configure(auth::init_routes))
            .service(web::scope("/events").configure(event::init_routes))
            .service(web::scope("/user").configure(user::init_routes)),
    );
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use actix_web::web;
    use uuid::Uuid;

    use crate::db::memory::MemoryStore;
    use crate::service::auth::jwt;
    use crate::service::clock::SystemClock;
    use crate::service::user::TokenSettings;
    use crate::service::AppState;

    pub const SECRET: &str = "handler-secret";

    pub fn state() -> web::Data<AppState> {
        web::Data::new(AppState::new(
            MemoryStore::new(),
            TokenSettings {
                secret: SECRET.to_string(),
                ttl_secs: 3600,
            },
            Arc::new(SystemClock),
        ))
    }

    pub fn bearer(uid: Uuid, is_admin: bool) -> (&'static str, String) {
        let token = jwt::create(uid, "test@tolosa.fr", is_admin, SECRET, 3600)
            .unwrap_or_default();
        ("Authorization", format!("Bearer {token}"))
    }
}
