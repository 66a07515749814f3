use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use log::error;
use serde_json::json;
use uuid::Uuid;

use crate::dto::{
    EventQuery, FlagEventDto, ModerationQuery, NewEventDto, RemoveEventDto, ReportQuery,
    UpdateEventDto,
};
use crate::errors::MyError;
use crate::models::{EventStatus, ReportStatus};
use crate::service::auth::{require_admin, require_user};
use crate::service::event::parse_status_filter;
use crate::service::AppState;

fn failed(err: MyError) -> HttpResponse {
    if err.is_internal() {
        error!("[{:} : {:}] INTERNAL SERVER ERROR: {:?}", file!(), line!(), err);
    }
    HttpResponse::from_error(err)
}

fn rejected(err: MyError) -> HttpResponse {
    if err.is_internal() {
        error!("[{:} : {:}] INTERNAL SERVER ERROR: {:?}", file!(), line!(), err);
    }
    err.rejection()
}

#[get("")]
pub async fn get_all(query: web::Query<EventQuery>, state: web::Data<AppState>) -> impl Responder {
    match state.events.list(&query).await {
        Ok(events) => HttpResponse::Ok().json(json!({ "success": true, "events": events })),
        Err(err) => failed(err),
    }
}

#[post("")]
pub async fn create(
    req: HttpRequest,
    new_event_dto: web::Json<NewEventDto>,
    state: web::Data<AppState>,
) -> impl Responder {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(err) => return failed(err),
    };
    match state.events.create(&user, new_event_dto.into_inner()).await {
        Ok(event) => HttpResponse::Created().json(json!({ "success": true, "event": event })),
        Err(err) => rejected(err),
    }
}

#[get("/admin/moderation")]
pub async fn moderation(
    req: HttpRequest,
    query: web::Query<ModerationQuery>,
    state: web::Data<AppState>,
) -> impl Responder {
    if let Err(err) = require_admin(&req) {
        return failed(err);
    }
    let status = match parse_status_filter::<EventStatus>(query.status.as_deref()) {
        Ok(status) => status,
        Err(err) => return failed(err),
    };
    match state.events.moderation(status, query.limit, query.offset).await {
        Ok(events) => HttpResponse::Ok().json(json!({ "success": true, "events": events })),
        Err(err) => failed(err),
    }
}

#[get("/admin/reports")]
pub async fn reports(
    req: HttpRequest,
    query: web::Query<ReportQuery>,
    state: web::Data<AppState>,
) -> impl Responder {
    if let Err(err) = require_admin(&req) {
        return failed(err);
    }
    let status = match parse_status_filter::<ReportStatus>(query.status.as_deref()) {
        Ok(status) => status,
        Err(err) => return failed(err),
    };
    match state.events.reports(status).await {
        Ok(reports) => HttpResponse::Ok().json(json!({ "success": true, "reports": reports })),
        Err(err) => failed(err),
    }
}

#[delete("/admin/{id}")]
pub async fn admin_delete(
    req: HttpRequest,
    id: web::Path<Uuid>,
    body: Option<web::Json<RemoveEventDto>>,
    state: web::Data<AppState>,
) -> impl Responder {
    let admin = match require_admin(&req) {
        Ok(admin) => admin,
        Err(err) => return failed(err),
    };
    let reason = body.and_then(|b| b.into_inner().reason);
    match state.events.admin_remove(id.into_inner(), &admin, reason).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true, "message": "Event removed by admin" })),
        Err(err) => rejected(err),
    }
}

#[get("/{id}")]
pub async fn get_by_id(id: web::Path<Uuid>, state: web::Data<AppState>) -> impl Responder {
    match state.events.get_by_id(id.into_inner()).await {
        Ok(event) => HttpResponse::Ok().json(json!({ "success": true, "event": event })),
        Err(err) => failed(err),
    }
}

#[put("/{id}")]
pub async fn update(
    req: HttpRequest,
    id: web::Path<Uuid>,
    update_event_dto: web::Json<UpdateEventDto>,
    state: web::Data<AppState>,
) -> impl Responder {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(err) => return failed(err),
    };
    match state
        .events
        .update(id.into_inner(), update_event_dto.into_inner(), &user)
        .await
    {
        Ok(event) => HttpResponse::Ok().json(json!({ "success": true, "event": event })),
        Err(err) => rejected(err),
    }
}

#[delete("/{id}")]
pub async fn delete(req: HttpRequest, id: web::Path<Uuid>, state: web::Data<AppState>) -> impl Responder {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(err) => return failed(err),
    };
    match state.events.delete(id.into_inner(), &user).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true, "message": "Event deleted successfully" })),
        Err(err) => rejected(err),
    }
}

#[get("/{id}/attendees")]
pub async fn attendees(id: web::Path<Uuid>, state: web::Data<AppState>) -> impl Responder {
    match state.attendance.attendees(id.into_inner()).await {
        Ok(attendees) => HttpResponse::Ok().json(json!({ "success": true, "attendees": attendees })),
        Err(err) => failed(err),
    }
}

#[post("/{id}/join")]
pub async fn join(req: HttpRequest, event_id: web::Path<Uuid>, state: web::Data<AppState>) -> impl Responder {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(err) => return failed(err),
    };
    match state.attendance.join(event_id.into_inner(), user.uid).await {
        Ok(attendee) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Successfully joined event",
            "attendee": attendee,
        })),
        Err(err) => rejected(err),
    }
}

#[post("/{id}/leave")]
pub async fn leave(req: HttpRequest, event_id: web::Path<Uuid>, state: web::Data<AppState>) -> impl Responder {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(err) => return failed(err),
    };
    match state.attendance.leave(event_id.into_inner(), user.uid).await {
        Ok(promoted) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Successfully left event",
            "promoted": promoted,
        })),
        Err(err) => rejected(err),
    }
}

#[post("/{id}/flag")]
pub async fn flag(
    req: HttpRequest,
    event_id: web::Path<Uuid>,
    body: web::Json<FlagEventDto>,
    state: web::Data<AppState>,
) -> impl Responder {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(err) => return failed(err),
    };
    match state
        .events
        .flag(event_id.into_inner(), &user, body.into_inner().reason)
        .await
    {
        Ok(report) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Event flagged for review",
            "report": report,
        })),
        Err(err) => rejected(err),
    }
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_all)
        .service(create)
        .service(moderation)
        .service(reports)
        .service(admin_delete)
        .service(get_by_id)
        .service(update)
        .service(delete)
        .service(attendees)
        .service(join)
        .service(leave)
        .service(flag);
}
