use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use chrono::NaiveDate;
use log::error;
use serde::Deserialize;
use serde_json::json;

use crate::filters::{matches_eq, matches_search, opt};
use crate::gate::require_role;
use crate::models::{is_valid_class, AttendanceRecord, AttendanceStatus};
use crate::AppState;

#[derive(Debug, Deserialize)]
struct AttendanceListQuery {
    search: Option<String>,
    date: Option<String>,
    class_label: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AttendancePayload {
    pub date: NaiveDate,
    pub class_label: String,
    pub student_id: i32,
    pub status: AttendanceStatus,
}

/// Resolve the student's display name as it is right now. The value is
/// stored on the record and never re-synced afterwards.
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
async fn list_attendance(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    query: web::Query<AttendanceListQuery>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    let rows = sqlx::query_as::<_, AttendanceRecord>(
        "SELECT id, date, class_label, student_id, student_name, status, created_at, updated_at
         FROM attendance ORDER BY date DESC, id DESC",
    )
    .fetch_all(&app_state.db)
    .await;

    let rows = match rows {
        Ok(rows) => rows,
        Err(e) => {
            error!("Failed to fetch attendance: {}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Failed to fetch attendance"
            }));
        }
    };

    let search = query.search.as_deref().unwrap_or("");
    let records: Vec<AttendanceRecord> = rows
        .into_iter()
        .filter(|r| {
            matches_search(search, &[&r.student_name])
                && matches_eq(opt(&query.date), &r.date.to_string())
                && matches_eq(opt(&query.class_label), &r.class_label)
                && matches_eq(opt(&query.status), r.status.as_str())
        })
        .collect();

    HttpResponse::Ok().json(records)
}

#[post("")]
async fn create_attendance(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    payload: web::Json<AttendancePayload>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    if !is_valid_class(&payload.class_label) {
        return HttpResponse::BadRequest().json(json!({
            "error": "Unknown class level"
        }));
    }

    let student_name = match snapshot_student_name(&app_state.db, payload.student_id).await {
        Ok(name) => name,
        Err(response) => return response,
    };

    // Duplicate records for the same student and day are allowed; nothing
    // reconciles them.
    let result = sqlx::query_scalar::<_, i32>(
        "INSERT INTO attendance (date, class_label, student_id, student_name, status)
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(payload.date)
    .bind(&payload.class_label)
    .bind(payload.student_id)
    .bind(&student_name)
    .bind(payload.status)
    .fetch_one(&app_state.db)
    .await;

    match result {
        Ok(id) => HttpResponse::Ok().json(json!({ "id": id })),
        Err(e) => {
            error!("Failed to create attendance record: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to create attendance record"
            }))
        }
    }
}

#[put("/{id}")]
async fn update_attendance(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    record_id: web::Path<i32>,
    payload: web::Json<AttendancePayload>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    if !is_valid_class(&payload.class_label) {
        return HttpResponse::BadRequest().json(json!({
            "error": "Unknown class level"
        }));
    }

    let student_name = match snapshot_student_name(&app_state.db, payload.student_id).await {
        Ok(name) => name,
        Err(response) => return response,
    };

    let result = sqlx::query(
        "UPDATE attendance
         SET date = $1, class_label = $2, student_id = $3, student_name = $4, status = $5,
             updated_at = NOW()
         WHERE id = $6",
    )
    .bind(payload.date)
    .bind(&payload.class_label)
    .bind(payload.student_id)
    .bind(&student_name)
    .bind(payload.status)
    .bind(record_id.into_inner())
    .execute(&app_state.db)
    .await;

    match result {
        Ok(done) if done.rows_affected() > 0 => HttpResponse::Ok().json(json!({
            "message": "Attendance updated successfully"
        })),
        Ok(_) => HttpResponse::NotFound().json(json!({
            "error": "Attendance record not found"
        })),
        Err(e) => {
            error!("Failed to update attendance: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to update attendance"
            }))
        }
    }
}

#[delete("/{id}")]
async fn delete_attendance(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    record_id: web::Path<i32>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    let result = sqlx::query("DELETE FROM attendance WHERE id = $1")
        .bind(record_id.into_inner())
        .execute(&app_state.db)
        .await;

    match result {
        Ok(done) if done.rows_affected() > 0 => HttpResponse::Ok().json(json!({
            "message": "Attendance record deleted"
        })),
        Ok(_) => HttpResponse::NotFound().json(json!({
            "error": "Attendance record not found"
        })),
        Err(e) => {
            error!("Failed to delete attendance record: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to delete attendance record"
            }))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/admin/attendance")
            .service(list_attendance)
            .service(create_attendance)
            .service(update_attendance)
            .service(delete_attendance),
    );
}
