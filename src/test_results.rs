use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use chrono::NaiveDate;
use log::error;
use serde::Deserialize;
use serde_json::json;

use crate::filters::{matches_eq, matches_search, opt};
use crate::gate::require_role;
use crate::models::{is_valid_subject, TestResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
struct ResultListQuery {
    search: Option<String>,
    subject: Option<String>,
    test_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TestResultPayload {
    pub student_id: i32,
    pub subject: String,
    pub test_type: String,
    pub test_date: NaiveDate,
    // Marks are recorded as submitted; obtained > total is not rejected.
    pub marks_obtained: i32,
    pub total_marks: i32,
}

fn validate_payload(payload: &TestResultPayload) -> Result<(), HttpResponse> {
    if !is_valid_subject(&payload.subject) {
        return Err(HttpResponse::BadRequest().json(json!({
            "error": "Unknown subject"
        })));
    }
    if payload.test_type.trim().is_empty() {
        return Err(HttpResponse::BadRequest().json(json!({
            "error": "Test type is required"
        })));
    }
    Ok(())
}

async fn snapshot_student_name(
    db: &sqlx::PgPool,
    student_id: i32,
) -> Result<String, HttpResponse> {
    let name = sqlx::query_scalar::<_, String>(
        "SELECT first_name || ' ' || last_name FROM students WHERE id = $1",
    )
    .bind(student_id)
    .fetch_optional(db)
    .await;

    match name {
        Ok(Some(name)) => Ok(name),
        Ok(None) => Err(HttpResponse::BadRequest().json(json!({
            "error": "Unknown student"
        }))),
        Err(e) => {
            error!("Failed to resolve student name: {}", e);
            Err(HttpResponse::InternalServerError().json(json!({
                "error": "Database error"
            })))
        }
    }
}

#[get("")]
async fn list_results(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    query: web::Query<ResultListQuery>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    let rows = sqlx::query_as::<_, TestResult>(
        "SELECT id, student_id, student_name, subject, test_type, test_date,
                marks_obtained, total_marks, created_at, updated_at
         FROM test_results ORDER BY test_date DESC, id DESC",
    )
    .fetch_all(&app_state.db)
    .await;

    let rows = match rows {
        Ok(rows) => rows,
        Err(e) => {
            error!("Failed to fetch test results: {}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Failed to fetch test results"
            }));
        }
    };

    let search = query.search.as_deref().unwrap_or("");
    let results: Vec<TestResult> = rows
        .into_iter()
        .filter(|r| {
            matches_search(search, &[&r.student_name])
                && matches_eq(opt(&query.subject), &r.subject)
                && matches_eq(opt(&query.test_type), &r.test_type)
        })
        .collect();

    HttpResponse::Ok().json(results)
}

#[post("")]
async fn create_result(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    payload: web::Json<TestResultPayload>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    if let Err(response) = validate_payload(&payload) {
        return response;
    }

    let student_name = match snapshot_student_name(&app_state.db, payload.student_id).await {
        Ok(name) => name,
        Err(response) => return response,
    };

    let result = sqlx::query_scalar::<_, i32>(
        "INSERT INTO test_results (student_id, student_name, subject, test_type, test_date,
                                   marks_obtained, total_marks)
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind(payload.student_id)
    .bind(&student_name)
    .bind(&payload.subject)
    .bind(&payload.test_type)
    .bind(payload.test_date)
    .bind(payload.marks_obtained)
    .bind(payload.total_marks)
    .fetch_one(&app_state.db)
    .await;

    match result {
        Ok(id) => HttpResponse::Ok().json(json!({ "id": id })),
        Err(e) => {
            error!("Failed to create test result: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to create test result"
            }))
        }
    }
}

#[put("/{id}")]
async fn update_result(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    result_id: web::Path<i32>,
    payload: web::Json<TestResultPayload>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    if let Err(response) = validate_payload(&payload) {
        return response;
    }

    let student_name = match snapshot_student_name(&app_state.db, payload.student_id).await {
        Ok(name) => name,
        Err(response) => return response,
    };

    let result = sqlx::query(
        "UPDATE test_results
         SET student_id = $1, student_name = $2, subject = $3, test_type = $4,
             test_date = $5, marks_obtained = $6, total_marks = $7, updated_at = NOW()
         WHERE id = $8",
    )
    .bind(payload.student_id)
    .bind(&student_name)
    .bind(&payload.subject)
    .bind(&payload.test_type)
    .bind(payload.test_date)
    .bind(payload.marks_obtained)
    .bind(payload.total_marks)
    .bind(result_id.into_inner())
    .execute(&app_state.db)
    .await;

    match result {
        Ok(done) if done.rows_affected() > 0 => HttpResponse::Ok().json(json!({
            "message": "Test result updated successfully"
        })),
        Ok(_) => HttpResponse::NotFound().json(json!({
            "error": "Test result not found"
        })),
        Err(e) => {
            error!("Failed to update test result: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to update test result"
            }))
        }
    }
}

#[delete("/{id}")]
async fn delete_result(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    result_id: web::Path<i32>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    let result = sqlx::query("DELETE FROM test_results WHERE id = $1")
        .bind(result_id.into_inner())
        .execute(&app_state.db)
        .await;

    match result {
        Ok(done) if done.rows_affected() > 0 => HttpResponse::Ok().json(json!({
            "message": "Test result deleted"
        })),
        Ok(_) => HttpResponse::NotFound().json(json!({
            "error": "Test result not found"
        })),
        Err(e) => {
            error!("Failed to delete test result: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to delete test result"
            }))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/admin/results")
            .service(list_results)
            .service(create_result)
            .service(update_result)
            .service(delete_result),
    );
}
