use crate::{
    auth::{
        authenticate, generate_token, register as register_user, AuthenticatedUser, LoginRequest,
        RegisterRequest, TokenForm, TokenResponse,
    },
    error::AppError,
    models::{User, UserResponse},
    state::AppState,
};
use actix_web::{get, post, web, HttpResponse, Responder};
use log::info;
use validator::Validate;

fn issue_token(state: &AppState, user: &User) -> Result<TokenResponse, AppError> {
    let access_token = generate_token(
        &user.email,
        state.config.access_token_ttl(),
        &state.config.jwt_secret,
    )?;
    info!("Issued session token for user {}", user.id);
    Ok(TokenResponse::bearer(access_token))
}

/// Register a new user
///
/// Creates the account and returns its public record. No token is issued;
/// the client logs in separately.
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    let user = register_user(
        state.users.as_ref(),
        register_data.into_inner(),
        state.config.bcrypt_cost,
    )
    .await?;
    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// Login user
///
/// Exchanges an email and password for a bearer token.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;
    let user = authenticate(state.users.as_ref(), &login_data.email, &login_data.password).await?;
    Ok(HttpResponse::Ok().json(issue_token(&state, &user)?))
}

/// OAuth2 password grant: same as `login`, with the email in the `username` form field.
#[post("/token")]
pub async fn token_grant(
    state: web::Data<AppState>,
    form: web::Form<TokenForm>,
) -> Result<impl Responder, AppError> {
    let user = authenticate(state.users.as_ref(), &form.username, &form.password).await?;
    Ok(HttpResponse::Ok().json(issue_token(&state, &user)?))
}

/// The caller's own account.
#[get("/me")]
pub async fn me(user: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().json(UserResponse::from(user.0))
}
