//!
//! # Custom Error Handling
//!
//! This module defines `AppError`, the single error type returned by handlers,
//! repositories and the authentication layer. It implements
//! `actix_web::error::ResponseError`, so any `AppError` bubbling out of a handler
//! or middleware becomes a JSON response with the matching status code.
//!
//! Credential failures (unknown email, wrong password, bad or expired token) all
//! collapse into `Unauthorized`, and ownership failures collapse into `NotFound`,
//! so callers cannot probe which accounts or tasks exist.

use actix_web::{
    error::{JsonPayloadError, PathError, QueryPayloadError, UrlencodedError},
    http::header,
    HttpRequest, HttpResponse, ResponseError,
};
use log::error;
use serde_json::json;
use std::fmt;
use validator::{ValidationError, ValidationErrors};

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Missing, invalid or expired credentials (HTTP 401).
    Unauthorized(String),
    /// Malformed request that could not be parsed (HTTP 400).
    BadRequest(String),
    /// Registration with an email that already has an account (HTTP 400).
    DuplicateEmail,
    /// Resource absent, or owned by someone else (HTTP 404).
    NotFound(String),
    /// Unexpected server-side failure (HTTP 500).
    InternalServerError(String),
    /// Failure reported by the persistence store (HTTP 500).
    DatabaseError(String),
    /// Field-level validation failures (HTTP 400).
    ValidationError(ValidationErrors),
}

impl AppError {
    pub fn invalid_credentials() -> Self {
        AppError::Unauthorized("Could not validate credentials".into())
    }

    pub fn task_not_found() -> Self {
        AppError::NotFound("Task not found".into())
    }
}

pub(crate) fn validation_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::DuplicateEmail => write!(f, "Email already registered"),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::ValidationError(errors) => write!(f, "Validation Error: {}", errors),
        }
    }
}

impl std::error::Error for AppError {}

/// Converts `AppError` variants into `HttpResponse` objects.
///
/// Server-side failures are logged here and answered with a generic body,
/// so database details never reach the client.
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Unauthorized(msg) => HttpResponse::Unauthorized()
                .insert_header((header::WWW_AUTHENTICATE, "Bearer"))
                .json(json!({ "error": msg })),
            AppError::BadRequest(msg) => HttpResponse::BadRequest().json(json!({ "error": msg })),
            AppError::DuplicateEmail => HttpResponse::BadRequest().json(json!({
                "error": "Email already registered"
            })),
            AppError::NotFound(msg) => HttpResponse::NotFound().json(json!({ "error": msg })),
            AppError::ValidationError(errors) => HttpResponse::BadRequest().json(json!({
                "error": "Validation failed",
                "details": errors
            })),
            AppError::InternalServerError(msg) | AppError::DatabaseError(msg) => {
                error!("{}", msg);
                HttpResponse::InternalServerError().json(json!({
                    "error": "Internal server error"
                }))
            }
        }
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// A unique violation can only come from `users.email`, so it is reported as
/// `DuplicateEmail`. Everything else is a store failure.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        if let sqlx::Error::Database(db_error) = &error {
            if db_error.code().as_deref() == Some("23505") {
                return AppError::DuplicateEmail;
            }
        }
        AppError::DatabaseError(error.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> AppError {
        AppError::ValidationError(errors)
    }
}

/// Any JWT failure (bad signature, malformed token, expiry) is a credential failure.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthorized(format!("Invalid token: {}", error))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(format!("Password hashing failed: {}", error))
    }
}

/// Error handler for `web::JsonConfig`: malformed bodies become 400s with our JSON shape.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(err.to_string()).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(err.to_string()).into()
}

pub fn form_error_handler(err: UrlencodedError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(err.to_string()).into()
}

/// A path id that does not parse can never name an existing task.
pub fn path_error_handler(_err: PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::task_not_found().into()
}
