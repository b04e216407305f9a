//! Administrator rights are checked in the cohort of the record being
//! changed, whatever `cohortYear` the caller sends.

mod common;

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::Key;
use actix_web::{App, http::StatusCode, test, web};
use sqlx::PgPool;

use common::*;
use skylab::handlers;
use skylab::mailer::{LogMailer, SharedMailer};
use skylab::models::role::administrator;
use skylab::models::{evaluation, project};

macro_rules! app {
    ($pool:expr) => {{
        let mailer: SharedMailer = Arc::new(LogMailer);
        test::init_service(
            App::new()
                .wrap(SessionMiddleware::new(CookieSessionStore::default(), Key::generate()))
                .app_data(web::Data::new($pool.clone()))
                .app_data(web::Data::new(mailer))
                .service(web::scope("/api").configure(handlers::configure)),
        )
        .await
    }};
}

/// Signs in and returns the session cookie.
macro_rules! login {
    ($app:expr, $email:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(serde_json::json!({ "email": $email, "password": PASSWORD }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        resp.response().cookies().next().expect("session cookie").into_owned()
    }};
}

/// Two 2025 projects joined by a relation, an administrator of 2024 only and
/// an administrator of 2025.
async fn setup(pool: &PgPool) -> (i64, i64, i64) {
    create_cohort(pool, YEAR).await;
    create_cohort(pool, OTHER_YEAR).await;
    let old_admin = create_user(pool, "old.admin@u.nus.edu").await;
    administrator::create(pool, old_admin, YEAR).await.unwrap();
    let new_admin = create_user(pool, "new.admin@u.nus.edu").await;
    administrator::create(pool, new_admin, OTHER_YEAR).await.unwrap();

    let a = create_project(pool, OTHER_YEAR, "Alpha", None).await;
    let b = create_project(pool, OTHER_YEAR, "Beta", None).await;
    let relation = evaluation::create(pool, a, b).await.unwrap();
    (relation.id, a, b)
}

#[sqlx::test]
async fn admin_of_another_cohort_cannot_delete_relation(pool: PgPool) {
    let (relation_id, _, _) = setup(&pool).await;
    let app = app!(pool);

    let cookie = login!(app, "old.admin@u.nus.edu");
    for uri in [format!("/api/relations/{relation_id}?cohortYear={YEAR}"), format!("/api/relations/{relation_id}")] {
        let req = test::TestRequest::delete().uri(&uri).cookie(cookie.clone()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
    assert!(evaluation::find_by_id(&pool, relation_id).await.is_ok());

    let cookie = login!(app, "new.admin@u.nus.edu");
    let req = test::TestRequest::delete()
        .uri(&format!("/api/relations/{relation_id}"))
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(evaluation::find_by_id(&pool, relation_id).await.is_err());
}

#[sqlx::test]
async fn admin_of_another_cohort_cannot_change_projects(pool: PgPool) {
    let (_, a, b) = setup(&pool).await;
    let app = app!(pool);
    let cookie = login!(app, "old.admin@u.nus.edu");

    let req = test::TestRequest::put()
        .uri(&format!("/api/projects/{a}?cohortYear={YEAR}"))
        .cookie(cookie.clone())
        .set_json(serde_json::json!({ "name": "Renamed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/projects/{b}?cohortYear={YEAR}"))
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/relations")
        .cookie(cookie)
        .set_json(serde_json::json!({ "from": b, "to": a }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(project::get(&pool, a).await.unwrap().name, "Alpha");
    assert!(project::get(&pool, b).await.is_ok());
}
