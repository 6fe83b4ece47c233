// Route exports
pub mod auth;
pub mod donors;
pub mod matches;
pub mod requests;

use actix_web::{error, web, HttpRequest};
use std::sync::Arc;
use crate::error::AppError;
use crate::services::{MatchStore, TokenKeys};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MatchStore>,
    pub keys: TokenKeys,
}

impl AppState {
    pub fn new(store: Arc<dyn MatchStore>, keys: TokenKeys) -> Self {
        Self { store, keys }
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(matches::configure)
            .configure(auth::configure)
            .configure(donors::configure)
            .configure(requests::configure),
    );
}

/// JSON body config reporting malformed payloads in the common error shape
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(handle_json_payload_error)
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(handle_query_payload_error)
}

fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    AppError::Validation(format!("Invalid JSON: {}", err)).into()
}

fn handle_query_payload_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(format!("Invalid query: {}", err)).into()
}
