use actix_web::{
    error,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use derive_more::{Display, Error};
use log::error;
use serde_json::json;

use crate::db::StoreError;

#[derive(Debug, Display, Error, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum MyError {
    #[display(fmt = "internal error")]
    InternalError,

    #[display(fmt = "{}", _0)]
    BadClientData(#[error(not(source))] String),

    #[display(fmt = "{}", _0)]
    NotFound(#[error(not(source))] String),

    #[display(fmt = "{}", _0)]
    Conflict(#[error(not(source))] String),

    #[display(fmt = "user already joined this event")]
    AlreadyJoined,

    #[display(fmt = "user is not attending this event")]
    NotAttending,

    #[display(fmt = "event cannot be edited within 1 hour of start time")]
    EditWindowClosed,

    #[display(fmt = "authentication error")]
    AuthError,

    #[display(fmt = "invalid or expired token")]
    InvalidToken,

    #[display(fmt = "unauthorized")]
    Unauthorized,
}

impl MyError {
    pub fn code(&self) -> &'static str {
        match self {
            MyError::InternalError => "INTERNAL_ERROR",
            MyError::BadClientData(_) => "VALIDATION_ERROR",
            MyError::NotFound(_) => "NOT_FOUND",
            MyError::Conflict(_) => "CONFLICT",
            MyError::AlreadyJoined => "ALREADY_JOINED",
            MyError::NotAttending => "NOT_ATTENDING",
            MyError::EditWindowClosed => "EDIT_WINDOW_CLOSED",
            MyError::AuthError => "AUTH_ERROR",
            MyError::InvalidToken => "INVALID_TOKEN",
            MyError::Unauthorized => "UNAUTHORIZED",
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, MyError::InternalError)
    }

    pub fn body(&self) -> serde_json::Value {
        json!({
            "success": false,
            "error": self.to_string(),
            "code": self.code(),
        })
    }

    /// Response for mutating routes, where every client-side failure is a 400.
    pub fn rejection(&self) -> HttpResponse {
        let status = if self.is_internal() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::BAD_REQUEST
        };
        HttpResponse::build(status)
            .insert_header(ContentType::json())
            .json(self.body())
    }
}

impl error::ResponseError for MyError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(self.body())
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            MyError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            MyError::BadClientData(_) => StatusCode::BAD_REQUEST,
            MyError::NotFound(_) => StatusCode::NOT_FOUND,
            MyError::Conflict(_) => StatusCode::CONFLICT,
            MyError::AlreadyJoined => StatusCode::BAD_REQUEST,
            MyError::NotAttending => StatusCode::BAD_REQUEST,
            MyError::EditWindowClosed => StatusCode::BAD_REQUEST,
            MyError::AuthError => StatusCode::UNAUTHORIZED,
            MyError::InvalidToken => StatusCode::FORBIDDEN,
            MyError::Unauthorized => StatusCode::FORBIDDEN,
        }
    }
}

impl From<StoreError> for MyError {
    fn from(err: StoreError) -> Self {
        error!("store failure: {}", err);
        MyError::InternalError
    }
}
