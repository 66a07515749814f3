use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use log::{error, info};
use serde_json::json;

use crate::dto::{LoginUserRequest, NewUserDto, UpdateProfileDto};
use crate::errors::MyError;
use crate::service::auth::require_user;
use crate::service::AppState;

#[post("/signup")]
pub async fn register(dto: web::Json<NewUserDto>, state: web::Data<AppState>) -> impl Responder {
    match state.users.create(dto.into_inner()).await {
        Ok(val) => {
            info!("RESPONSE /AUTH/SIGNUP: {:?}", val.user.uid);
            HttpResponse::Created().json(json!({ "success": true, "user": val.user, "token": val.token }))
        }
        Err(err @ MyError::Conflict(_)) => HttpResponse::from_error(err),
        Err(err) => err.rejection(),
    }
}

#[post("/signin")]
pub async fn login(dto: web::Json<LoginUserRequest>, state: web::Data<AppState>) -> impl Responder {
    match state.users.login(dto.into_inner()).await {
        Ok(val) => {
            info!("RESPONSE /AUTH/SIGNIN: {:?}", val.user.uid);
            HttpResponse::Ok().json(json!({ "success": true, "user": val.user, "token": val.token }))
        }
        Err(err) => {
            if err.is_internal() {
                error!("[{:} : {:}] INTERNAL SERVER ERROR: {:?}", file!(), line!(), err);
            }
            HttpResponse::from_error(err)
        }
    }
}

#[get("/profile")]
pub async fn profile(req: HttpRequest, state: web::Data<AppState>) -> impl Responder {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(err) => return HttpResponse::from_error(err),
    };
    match state.users.get_by_id(user.uid).await {
        Ok(user) => HttpResponse::Ok().json(json!({ "success": true, "user": user })),
        Err(err) => HttpResponse::from_error(err),
    }
}

#[put("/profile")]
pub async fn update_profile(
    req: HttpRequest,
    dto: web::Json<UpdateProfileDto>,
    state: web::Data<AppState>,
) -> impl Responder {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(err) => return HttpResponse::from_error(err),
    };
    match state.users.update_profile(user.uid, dto.into_inner()).await {
        Ok(user) => HttpResponse::Ok().json(json!({ "success": true, "user": user })),
        Err(err) => err.rejection(),
    }
}

#[delete("/account")]
pub async fn delete_account(req: HttpRequest, state: web::Data<AppState>) -> impl Responder {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(err) => return HttpResponse::from_error(err),
    };
    match state.users.delete_account(user.uid).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true, "message": "Account deleted" })),
        Err(err) => HttpResponse::from_error(err),
    }
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register)
        .service(login)
        .service(profile)
        .service(update_profile)
        .service(delete_account);
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    use crate::handlers::init_routes;
    use crate::handlers::testing::{state, SECRET};
    use crate::service::auth::AuthMiddleware;

    #[actix_web::test]
    async fn sign_up_sign_in_and_profile() {
        let app = test::init_service(
            App::new()
                .app_data(state())
                .wrap(AuthMiddleware::new(SECRET))
                .configure(init_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/auth/signup")
            .set_json(json!({
                "email": "manon@tolosa.fr",
                "password": "carmes31",
                "displayName": "Manon"
            }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/auth/signin")
            .set_json(json!({ "email": "manon@tolosa.fr", "password": "carmes31" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let token = body["token"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri("/api/auth/profile")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["user"]["displayName"], "Manon");
        assert!(body["user"].get("pwdHash").is_none());

        let req = test::TestRequest::post()
            .uri("/api/auth/signin")
            .set_json(json!({ "email": "manon@tolosa.fr", "password": "nope-nope" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/auth/signup")
            .set_json(json!({
                "email": "manon@tolosa.fr",
                "password": "carmes31",
                "displayName": "Manon"
            }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }
}
