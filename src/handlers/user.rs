use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use log::info;
use serde_json::json;
use uuid::Uuid;

use crate::dto::{SuspendUserDto, UserEventsQuery, UsersQuery};
use crate::service::auth::{require_admin, require_user};
use crate::service::AppState;

// /user/events?type=attending|organized
#[get("/events")]
pub async fn get_user_events(
    req: HttpRequest,
    query: web::Query<UserEventsQuery>,
    state: web::Data<AppState>,
) -> impl Responder {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(err) => return HttpResponse::from_error(err),
    };
    info!("GET USER EVENTS: {:?} ({:?})", user.uid, query.mode);
    match state.attendance.user_events(user.uid, query.mode).await {
        Ok(events) => HttpResponse::Ok().json(json!({ "success": true, "events": events })),
        Err(err) => HttpResponse::from_error(err),
    }
}

#[get("/admin/users")]
pub async fn get_all(
    req: HttpRequest,
    query: web::Query<UsersQuery>,
    state: web::Data<AppState>,
) -> impl Responder {
    if let Err(err) = require_admin(&req) {
        return HttpResponse::from_error(err);
    }
    match state.users.get_all(query.limit, query.offset).await {
        Ok(users) => HttpResponse::Ok().json(json!({ "success": true, "users": users })),
        Err(err) => HttpResponse::from_error(err),
    }
}

#[post("/admin/users/{id}/promote")]
pub async fn promote(req: HttpRequest, id: web::Path<Uuid>, state: web::Data<AppState>) -> impl Responder {
    if let Err(err) = require_admin(&req) {
        return HttpResponse::from_error(err);
    }
    match state.users.set_admin(id.into_inner(), true).await {
        Ok(user) => HttpResponse::Ok().json(json!({ "success": true, "user": user })),
        Err(err) => err.rejection(),
    }
}

#[post("/admin/users/{id}/demote")]
pub async fn demote(req: HttpRequest, id: web::Path<Uuid>, state: web::Data<AppState>) -> impl Responder {
    if let Err(err) = require_admin(&req) {
        return HttpResponse::from_error(err);
    }
    match state.users.set_admin(id.into_inner(), false).await {
        Ok(user) => HttpResponse::Ok().json(json!({ "success": true, "user": user })),
        Err(err) => err.rejection(),
    }
}

#[post("/admin/users/{id}/suspend")]
pub async fn suspend(
    req: HttpRequest,
    id: web::Path<Uuid>,
    body: web::Json<SuspendUserDto>,
    state: web::Data<AppState>,
) -> impl Responder {
    if let Err(err) = require_admin(&req) {
        return HttpResponse::from_error(err);
    }
    match state.users.suspend(id.into_inner(), body.into_inner().reason).await {
        Ok(user) => HttpResponse::Ok().json(json!({ "success": true, "user": user })),
        Err(err) => err.rejection(),
    }
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_user_events)
        .service(get_all)
        .service(promote)
        .service(demote)
        .service(suspend);
}
