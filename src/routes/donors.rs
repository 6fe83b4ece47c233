use actix_web::{web, HttpResponse};
use crate::error::AppError;
use crate::models::{Actor, DeactivateResponse, DonorProfileRequest, DonorSearchQuery};
use crate::routes::AppState;
use crate::services::accounts;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/donor/profile", web::put().to(save_profile))
        .route("/donor/deactivate", web::post().to(deactivate))
        .route("/donor", web::delete().to(delete_account))
        .route("/donors", web::get().to(list_donors));
}

/// PUT /api/v1/donor/profile
async fn save_profile(
    state: web::Data<AppState>,
    actor: Actor,
    req: web::Json<DonorProfileRequest>,
) -> Result<HttpResponse, AppError> {
    let donor = accounts::save_donor_profile(state.store.as_ref(), &actor, req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(donor))
}

/// POST /api/v1/donor/deactivate
async fn deactivate(state: web::Data<AppState>, actor: Actor) -> Result<HttpResponse, AppError> {
    let cleared = accounts::deactivate_donor(state.store.as_ref(), &actor).await?;
    Ok(HttpResponse::Ok().json(DeactivateResponse {
        notifications_cleared: cleared,
    }))
}

/// DELETE /api/v1/donor
async fn delete_account(state: web::Data<AppState>, actor: Actor) -> Result<HttpResponse, AppError> {
    accounts::delete_donor_account(state.store.as_ref(), &actor).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/v1/donors?organ={organ}&location={location}
async fn list_donors(
    state: web::Data<AppState>,
    actor: Actor,
    query: web::Query<DonorSearchQuery>,
) -> Result<HttpResponse, AppError> {
    let donors =
        accounts::search_donors(state.store.as_ref(), &actor, query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(donors))
}
