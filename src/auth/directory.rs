//! User directory: registration, password login and session resolution.

use log::{info, warn};
use validator::Validate;

use super::password::{hash_password, verify_password};
use super::token::verify_token;
use super::RegisterRequest;
use crate::error::AppError;
use crate::models::{NewUser, User};
use crate::repository::UserRepository;

/// Registers a new account after validating the request and checking the email is free.
///
/// Only the bcrypt hash of the password is stored.
pub async fn register(
    users: &dyn UserRepository,
    request: RegisterRequest,
    bcrypt_cost: u32,
) -> Result<User, AppError> {
    request.validate()?;

    if users.find_by_email(&request.email).await?.is_some() {
        return Err(AppError::DuplicateEmail);
    }

    let hashed_password = hash_password(&request.password, bcrypt_cost)?;
    let user = users
        .insert(NewUser {
            name: request.name.trim().to_string(),
            email: request.email,
            hashed_password,
        })
        .await?;

    info!("Registered user {}", user.id);
    Ok(user)
}

/// Checks an email/password pair. Unknown email and wrong password produce the same error.
pub async fn authenticate(
    users: &dyn UserRepository,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let user = users.find_by_email(email).await?;
    let verified = match &user {
        Some(user) => verify_password(password, &user.hashed_password)?,
        None => false,
    };

    match user {
        Some(user) if verified => Ok(user),
        _ => {
            warn!("Rejected login attempt");
            Err(AppError::Unauthorized("Incorrect email or password".into()))
        }
    }
}

/// Resolves a bearer token to the user named in its claims.
pub async fn resolve_session(
    users: &dyn UserRepository,
    token: &str,
    secret: &str,
) -> Result<User, AppError> {
    let claims = verify_token(token, secret).map_err(|err| {
        warn!("Rejected session token: {}", err);
        AppError::invalid_credentials()
    })?;

    users
        .find_by_email(&claims.sub)
        .await?
        .ok_or_else(AppError::invalid_credentials)
}
