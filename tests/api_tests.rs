// HTTP tests driving the actix app against the in-memory store

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use serde_json::{json, Value};
use std::sync::Arc;
use organ_match::models::{Actor, Role};
use organ_match::routes::{self, AppState};
use organ_match::services::{MemoryStore, TokenKeys};

const SECRET: &str = "api-test-secret";

fn state(store: Arc<MemoryStore>) -> web::Data<AppState> {
    web::Data::new(AppState::new(store, TokenKeys::new(SECRET, 900)))
}

fn bearer(user_id: i64, role: Role) -> (header::HeaderName, String) {
    let token = TokenKeys::new(SECRET, 900)
        .issue(Actor::new(user_id, role))
        .unwrap();
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

macro_rules! app {
    ($store:expr) => {
        test::init_service(
            App::new()
                .app_data(state($store))
                .app_data(routes::json_config())
                .app_data(routes::query_config())
                .configure(routes::configure_routes),
        )
        .await
    };
}

#[actix_web::test]
async fn test_health_reports_store_state() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store.clone());

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");

    store.set_unavailable(true);
    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "degraded");
}

#[actix_web::test]
async fn test_register_login_request_and_board() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store.clone());

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({
            "name": "General",
            "email": "admin@general.org",
            "password": "pw-hospital",
            "role": "hospital",
            "consent": true
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let registered: Value = test::read_body_json(resp).await;
    assert_eq!(registered["role"], "hospital");

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({
            "name": "Riley",
            "email": "riley@donors.org",
            "password": "pw-donor",
            "role": "donor"
        }))
        .to_request();
    let donor: Value = test::call_and_read_body_json(&app, req).await;
    let donor_auth = bearer(donor["user_id"].as_i64().unwrap(), Role::Donor);

    let req = test::TestRequest::put()
        .uri("/api/v1/donor/profile")
        .insert_header(donor_auth.clone())
        .set_json(json!({
            "blood_type": "O+",
            "organs": ["kidney", "liver"],
            "location": "Denver"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({"email": "admin@general.org", "password": "pw-hospital"}))
        .to_request();
    let login: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(login["token_type"], "Bearer");
    assert_eq!(login["expires_in"], 900);
    let hospital_token = format!("Bearer {}", login["access_token"].as_str().unwrap());

    let req = test::TestRequest::post()
        .uri("/api/v1/requests")
        .insert_header((header::AUTHORIZATION, hospital_token.clone()))
        .set_json(json!({
            "patient_name": "Jordan Doe",
            "required_organ": "kidney",
            "blood_type": "O+",
            "urgency_level": "Critical",
            "location": "denver"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["generation"]["outcome"], "generated");
    assert_eq!(created["generation"]["matches_created"], 1);
    let request_id = created["request"]["id"].as_i64().unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/matches")
        .insert_header(donor_auth.clone())
        .to_request();
    let board: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(board["matches"].as_array().unwrap().len(), 1);
    assert_eq!(board["matches"][0]["score"], 100.0);
    assert!(board["matches"][0].get("donor_name").is_none());
    assert_eq!(board["unread_count"], 1);

    let req = test::TestRequest::get()
        .uri("/api/v1/matches")
        .insert_header((header::AUTHORIZATION, hospital_token.clone()))
        .to_request();
    let board: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(board["matches"][0]["donor_name"], "Riley");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/requests/{}", request_id))
        .insert_header((header::AUTHORIZATION, hospital_token))
        .to_request();
    let deleted: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(deleted["matches_removed"], 1);
    assert_eq!(store.match_count(request_id).await, 0);
}

#[actix_web::test]
async fn test_protected_routes_require_token() {
    let app = app!(Arc::new(MemoryStore::new()));

    let req = test::TestRequest::get().uri("/api/v1/matches").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/v1/donors")
        .insert_header((header::AUTHORIZATION, "Bearer not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status_code"], 401);
}

#[actix_web::test]
async fn test_malformed_json_is_bad_request() {
    let app = app!(Arc::new(MemoryStore::new()));

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "validation_failed");
}

#[actix_web::test]
async fn test_role_and_ownership_errors() {
    let store = Arc::new(MemoryStore::new());
    let app = app!(store);

    let req = test::TestRequest::post()
        .uri("/api/v1/requests")
        .insert_header(bearer(1, Role::Donor))
        .set_json(json!({
            "patient_name": "X",
            "required_organ": "heart",
            "blood_type": "A+",
            "urgency_level": "Low"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri("/api/v1/requests/77")
        .insert_header(bearer(2, Role::Hospital))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({"email": "ghost@x.org", "password": "pw"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_duplicate_registration_conflicts() {
    let app = app!(Arc::new(MemoryStore::new()));
    let form = json!({
        "name": "Sam",
        "email": "sam@x.org",
        "password": "pw",
        "role": "donor"
    });

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(&form)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(&form)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Account with this email already exists.");
}
