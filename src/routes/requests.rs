use actix_web::{web, HttpResponse};
use crate::error::AppError;
use crate::models::{Actor, CreateOrganRequest};
use crate::routes::AppState;
use crate::services::lifecycle;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/requests", web::post().to(create_request))
        .route("/requests/{request_id}", web::delete().to(delete_request));
}

/// File an organ request and run matching
///
/// POST /api/v1/requests
///
/// Request body:
/// ```json
/// {
///   "patient_name": "string",
///   "required_organ": "kidney",
///   "blood_type": "O+",
///   "hla_profile": "string",
///   "urgency_level": "Low|High|Critical",
///   "location": "string"
/// }
/// ```
///
/// The request is stored even if matching could not reach the store;
/// the `generation` field of the response says what matching did.
async fn create_request(
    state: web::Data<AppState>,
    actor: Actor,
    req: web::Json<CreateOrganRequest>,
) -> Result<HttpResponse, AppError> {
    let created = lifecycle::create_request(state.store.as_ref(), &actor, req.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}

/// DELETE /api/v1/requests/{request_id}
async fn delete_request(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let deleted =
        lifecycle::delete_request(state.store.as_ref(), &actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(deleted))
}
