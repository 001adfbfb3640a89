//! Admin panel flows against a live database: list visibility after
//! create/edit/delete, the write-time student-name snapshot, and the fee
//! lifecycle. Each test runs only when TEST_DATABASE_URL points at a
//! disposable Postgres instance and exits early otherwise; rows are tagged
//! with a unique suffix so runs never interfere with each other.

use actix_web::{test, web};
use chrono::Utc;
use classbridge_backend::auth::issue_token;
use classbridge_backend::gate::RoleCache;
use classbridge_backend::{create_app, AppState};
use sqlx::postgres::PgPool;
use std::sync::Arc;

const JWT_SECRET: &str = "test-secret";

async fn db_state() -> Option<web::Data<AppState>> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let db = PgPool::connect(&url).await.expect("connect test database");
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("run migrations");
    Some(web::Data::new(AppState {
        db,
        jwt_secret: JWT_SECRET.to_string(),
        role_cache: Arc::new(RoleCache::new()),
    }))
}

fn suffix() -> String {
    format!("{}", Utc::now().timestamp_micros())
}

async fn seed_admin(db: &PgPool, username: &str) {
    sqlx::query(
        "INSERT INTO users (username, password_hash, name) VALUES ($1, 'seeded', 'Test Admin')
         ON CONFLICT (username) DO NOTHING",
    )
    .bind(username)
    .execute(db)
    .await
    .expect("seed admin user");
}

fn bearer(username: &str) -> (&'static str, String) {
    let token =
        issue_token(JWT_SECRET, username, vec!["admin".to_string()]).expect("token");
    ("Authorization", format!("Bearer {}", token))
}

fn student_json(first_name: &str) -> serde_json::Value {
    serde_json::json!({
        "first_name": first_name,
        "last_name": "Mehta",
        "class_label": "Class 1",
        "date_of_birth": "2018-06-15",
        "email": format!("{}@example.com", first_name.to_lowercase()),
        "parent_name": "Asha Mehta",
        "parent_phone": "9369428170",
        "address": "12 School Lane"
    })
}

#[actix_web::test]
async fn student_create_edit_delete_show_in_the_list() {
    let Some(state) = db_state().await else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };
    let db = state.db.clone();
    let app = test::init_service(create_app(state)).await;

    let s = suffix();
    let admin = format!("admin{}@school.example", s);
    seed_admin(&db, &admin).await;
    let auth = bearer(&admin);

    let first_name = format!("Zuri{}", s);
    let req = test::TestRequest::post()
        .uri("/api/admin/students")
        .insert_header(auth.clone())
        .set_json(student_json(&first_name))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let created: serde_json::Value = test::read_body_json(resp).await;
    let id = created["id"].as_i64().expect("created id");

    // The new row comes back through the list.
    let req = test::TestRequest::get()
        .uri(&format!("/api/admin/students?search={}", first_name))
        .insert_header(auth.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let rows: Vec<serde_json::Value> = test::read_body_json(resp).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"].as_i64(), Some(id));
    assert_eq!(rows[0]["last_name"], "Mehta");

    // An edit is reflected on the next fetch.
    let mut edited = student_json(&first_name);
    edited["last_name"] = serde_json::json!("Menon");
    let req = test::TestRequest::put()
        .uri(&format!("/api/admin/students/{}", id))
        .insert_header(auth.clone())
        .set_json(edited)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::get()
        .uri(&format!("/api/admin/students?search={}", first_name))
        .insert_header(auth.clone())
        .to_request();
    let rows: Vec<serde_json::Value> =
        test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(rows[0]["last_name"], "Menon");

    // After deletion the row is gone from the list.
    let req = test::TestRequest::delete()
        .uri(&format!("/api/admin/students/{}", id))
        .insert_header(auth.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::get()
        .uri(&format!("/api/admin/students?search={}", first_name))
        .insert_header(auth.clone())
        .to_request();
    let rows: Vec<serde_json::Value> =
        test::read_body_json(test::call_service(&app, req).await).await;
    assert!(rows.is_empty());
}

#[actix_web::test]
async fn attendance_keeps_name_snapshot_after_rename() {
    let Some(state) = db_state().await else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };
    let db = state.db.clone();
    let app = test::init_service(create_app(state)).await;

    let s = suffix();
    let admin = format!("admin{}@school.example", s);
    seed_admin(&db, &admin).await;
    let auth = bearer(&admin);

    let first_name = format!("Snap{}", s);
    let req = test::TestRequest::post()
        .uri("/api/admin/students")
        .insert_header(auth.clone())
        .set_json(student_json(&first_name))
        .to_request();
    let created: serde_json::Value =
        test::read_body_json(test::call_service(&app, req).await).await;
    let id = created["id"].as_i64().expect("created id");

    let req = test::TestRequest::post()
        .uri("/api/admin/attendance")
        .insert_header(auth.clone())
        .set_json(serde_json::json!({
            "date": "2024-04-01",
            "class_label": "Class 1",
            "student_id": id,
            "status": "present"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    // Rename the student; the attendance record must keep the name it was
    // written with.
    let renamed = format!("Renamed{}", s);
    let req = test::TestRequest::put()
        .uri(&format!("/api/admin/students/{}", id))
        .insert_header(auth.clone())
        .set_json(student_json(&renamed))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::get()
        .uri(&format!("/api/admin/attendance?search={}", first_name))
        .insert_header(auth.clone())
        .to_request();
    let rows: Vec<serde_json::Value> =
        test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["student_name"], format!("{} Mehta", first_name));

    let req = test::TestRequest::get()
        .uri(&format!("/api/admin/attendance?search={}", renamed))
        .insert_header(auth.clone())
        .to_request();
    let rows: Vec<serde_json::Value> =
        test::read_body_json(test::call_service(&app, req).await).await;
    assert!(rows.is_empty());
}

#[actix_web::test]
async fn fee_moves_through_its_lifecycle() {
    let Some(state) = db_state().await else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };
    let db = state.db.clone();
    let app = test::init_service(create_app(state)).await;

    let s = suffix();
    let admin = format!("admin{}@school.example", s);
    seed_admin(&db, &admin).await;
    let auth = bearer(&admin);

    let first_name = format!("Fee{}", s);
    let req = test::TestRequest::post()
        .uri("/api/admin/students")
        .insert_header(auth.clone())
        .set_json(student_json(&first_name))
        .to_request();
    let created: serde_json::Value =
        test::read_body_json(test::call_service(&app, req).await).await;
    let student_id = created["id"].as_i64().expect("created id");

    // A new fee starts pending with no payment date.
    let req = test::TestRequest::post()
        .uri("/api/admin/fees")
        .insert_header(auth.clone())
        .set_json(serde_json::json!({
            "student_id": student_id,
            "fee_type": "tuition",
            "amount": 3000,
            "due_date": "2024-04-01",
            "status": "pending"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let created: serde_json::Value = test::read_body_json(resp).await;
    let fee_id = created["id"].as_i64().expect("fee id");

    let req = test::TestRequest::get()
        .uri(&format!("/api/admin/fees?search={}&status=pending", first_name))
        .insert_header(auth.clone())
        .to_request();
    let rows: Vec<serde_json::Value> =
        test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(rows.len(), 1);
    assert!(rows[0]["payment_date"].is_null());

    // Settling it records the payment date and moves it out of pending.
    let req = test::TestRequest::put()
        .uri(&format!("/api/admin/fees/{}", fee_id))
        .insert_header(auth.clone())
        .set_json(serde_json::json!({
            "student_id": student_id,
            "fee_type": "tuition",
            "amount": 3000,
            "due_date": "2024-04-01",
            "status": "paid",
            "payment_date": "2024-04-05"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::get()
        .uri(&format!("/api/admin/fees?search={}&status=paid", first_name))
        .insert_header(auth.clone())
        .to_request();
    let rows: Vec<serde_json::Value> =
        test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["payment_date"], "2024-04-05");

    let req = test::TestRequest::get()
        .uri(&format!("/api/admin/fees?search={}&status=pending", first_name))
        .insert_header(auth.clone())
        .to_request();
    let rows: Vec<serde_json::Value> =
        test::read_body_json(test::call_service(&app, req).await).await;
    assert!(rows.is_empty());
}

#[actix_web::test]
async fn signup_and_parent_login_store_the_display_name() {
    let Some(state) = db_state().await else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };
    let db = state.db.clone();
    let app = test::init_service(create_app(state)).await;

    let s = suffix();
    let email = format!("priya{}@example.com", s);
    let req = test::TestRequest::post()
        .uri("/api/auth/signup")
        .set_json(serde_json::json!({
            "name": "Priya Nair",
            "email": email.clone(),
            "password": "secret123"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let name: String = sqlx::query_scalar("SELECT name FROM users WHERE username = $1")
        .bind(&email)
        .fetch_one(&db)
        .await
        .expect("signed-up user row");
    assert_eq!(name, "Priya Nair");

    // Admin-provisioned parent logins carry the parent's name too.
    let admin = format!("admin{}@school.example", s);
    seed_admin(&db, &admin).await;
    let auth = bearer(&admin);

    let first_name = format!("Named{}", s);
    let mut payload = student_json(&first_name);
    payload["parent_name"] = serde_json::json!("Rohit Sharma");
    payload["parent_password"] = serde_json::json!("secret123");
    let req = test::TestRequest::post()
        .uri("/api/admin/students")
        .insert_header(auth)
        .set_json(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let name: String = sqlx::query_scalar("SELECT name FROM users WHERE username = $1")
        .bind(format!("{}@example.com", first_name.to_lowercase()))
        .fetch_one(&db)
        .await
        .expect("parent login row");
    assert_eq!(name, "Rohit Sharma");
}
