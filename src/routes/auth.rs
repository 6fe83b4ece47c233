use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use std::future::{ready, Ready};
use crate::error::AppError;
use crate::models::{Actor, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use crate::routes::AppState;
use crate::services::accounts;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/auth/register", web::post().to(register))
        .route("/auth/login", web::post().to(login));
}

/// The caller, resolved from an `Authorization: Bearer` token
impl FromRequest for Actor {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<Actor, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state missing".to_string()))?;

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthenticated)?;

    state.keys.verify(token).map_err(|e| {
        tracing::debug!("Rejected bearer token on {}: {}", req.path(), e);
        AppError::Unauthenticated
    })
}

/// Register endpoint
///
/// POST /api/v1/auth/register
///
/// Request body:
/// ```json
/// {
///   "name": "string",
///   "email": "string",
///   "phone": "string",
///   "password": "string",
///   "role": "donor|hospital",
///   "consent": true
/// }
/// ```
async fn register(
    state: web::Data<AppState>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let user = accounts::register(state.store.as_ref(), req.into_inner()).await?;

    Ok(HttpResponse::Created().json(RegisterResponse {
        user_id: user.id,
        role: user.role,
    }))
}

/// Login endpoint
///
/// POST /api/v1/auth/login
///
/// The response carries every notification addressed to the user.
async fn login(
    state: web::Data<AppState>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let outcome = accounts::login(state.store.as_ref(), &state.keys, req.into_inner()).await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token: outcome.token,
        token_type: "Bearer".to_string(),
        expires_in: outcome.expires_in,
        role: outcome.actor.role,
        notifications: outcome.notifications,
    }))
}
