use std::future::{ready, Ready};
use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    HttpMessage, HttpRequest,
};
use futures_util::future::LocalBoxFuture;
use log::debug;
use uuid::Uuid;

use crate::errors::MyError;

/// Identity attached to a request carrying a valid bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct UserAuthData {
    pub uid: Uuid,
    pub email: String,
    pub is_admin: bool,
}

/// Marks a request whose bearer token failed verification.
#[derive(Debug, Clone, Copy)]
struct RejectedToken;

/// The authenticated caller. Anonymous requests get `AuthError`, requests
/// with a bad token get `InvalidToken`.
pub fn require_user(req: &HttpRequest) -> Result<UserAuthData, MyError> {
    let extensions = req.extensions();
    if let Some(user) = extensions.get::<UserAuthData>() {
        return Ok(user.clone());
    }
    if extensions.get::<RejectedToken>().is_some() {
        Err(MyError::InvalidToken)
    } else {
        Err(MyError::AuthError)
    }
}

pub fn require_admin(req: &HttpRequest) -> Result<UserAuthData, MyError> {
    let user = require_user(req)?;
    if user.is_admin {
        Ok(user)
    } else {
        Err(MyError::Unauthorized)
    }
}

/// Decodes `Authorization: Bearer` tokens and stores the identity in the
/// request extensions. Requests without a valid token pass through
/// anonymous; a bad token is only remembered so protected handlers can
/// refuse it.
pub struct AuthMiddleware {
    pub secret: Rc<String>,
}

impl AuthMiddleware {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Rc::new(secret.to_string()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            secret: self.secret.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    secret: Rc<String>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(token) = jwt::parse_request(&req, "Bearer ") {
            match jwt::decode_claims(&token, &self.secret) {
                Ok(claims) => {
                    req.extensions_mut().insert(UserAuthData {
                        uid: claims.uid,
                        email: claims.email,
                        is_admin: claims.is_admin,
                    });
                }
                Err(err) => {
                    debug!("rejected bearer token: {}", err);
                    req.extensions_mut().insert(RejectedToken);
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res)
        })
    }
}

pub mod jwt {
    use actix_web::dev::ServiceRequest;
    use chrono::Utc;
    use jsonwebtoken::{
        decode, encode, errors::Error, Algorithm, DecodingKey, EncodingKey, Header, Validation,
    };
    use uuid::Uuid;

    use crate::dto::Claims;

    /// Signs an HS256 token valid for `ttl_secs`.
    pub fn create(
        uid: Uuid,
        email: &str,
        is_admin: bool,
        secret: &str,
        ttl_secs: u64,
    ) -> Result<String, Error> {
        let exp = Utc::now().timestamp().max(0) as usize + ttl_secs as usize;
        let claims = Claims::new(uid, email, is_admin, exp);
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_ref()),
        )
    }

    /// Verifies signature and expiry.
    pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, Error> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &DecodingKey::from_secret(secret.as_ref()), &validation)
            .map(|data| data.claims)
    }

    pub fn parse_request(req: &ServiceRequest, prefix: &str) -> Option<String> {
        let auth_value = req.headers().get("Authorization")?.to_str().ok()?;
        auth_value
            .strip_prefix(prefix)
            .map(|token| token.trim().to_string())
            .or_else(|| Some(String::new()))
    }
}
