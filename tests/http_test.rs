//! Routing, guards and the error envelope. These requests never reach the
//! database, so the pool connects lazily to nothing.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, cookie::Key, http::StatusCode, test, web};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;

use skylab::handlers;
use skylab::mailer::{LogMailer, SharedMailer};

macro_rules! app {
    () => {{
        let pool = PgPoolOptions::new().connect_lazy("postgres://localhost/unused").unwrap();
        let mailer: SharedMailer = Arc::new(LogMailer);
        test::init_service(
            App::new()
                .wrap(SessionMiddleware::new(CookieSessionStore::default(), Key::generate()))
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(mailer))
                .service(web::scope("/api").configure(handlers::configure)),
        )
        .await
    }};
}

#[actix_web::test]
async fn protected_routes_require_a_session() {
    let app = app!();
    for uri in ["/api/users", "/api/projects", "/api/applications", "/api/auth/me"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Not logged in");
        assert!(body.get("meta").is_some());
    }
}

#[actix_web::test]
async fn mutations_must_send_json() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .insert_header(("content-type", "application/x-www-form-urlencoded"))
        .set_payload("email=a%40b.com&password=x")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Content-Type must be application/json for mutation requests");

    let req = test::TestRequest::post()
        .uri("/api/applications")
        .insert_header(("content-type", "text/plain"))
        .set_payload("hello")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn malformed_json_is_a_validation_error() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(serde_json::json!({ "email": "a@b.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["meta"][0]["field"], "body");
}
