use actix_web::{web, HttpResponse, Responder};
use crate::error::AppError;
use crate::models::{Actor, HealthResponse};
use crate::routes::AppState;
use crate::services::lifecycle;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/matches", web::get().to(match_board));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.store.health_check().await.unwrap_or(false);

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Matches visible to the caller plus their notifications
///
/// GET /api/v1/matches
///
/// Hospitals see every match; donors see only their own.
async fn match_board(state: web::Data<AppState>, actor: Actor) -> Result<HttpResponse, AppError> {
    let board = lifecycle::match_board(state.store.as_ref(), &actor).await?;

    tracing::debug!(
        "Returning {} matches and {} notifications for user {}",
        board.matches.len(),
        board.notifications.len(),
        actor.user_id
    );

    Ok(HttpResponse::Ok().json(board))
}

