use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::error;
use serde_json::json;

use crate::auth::Claims;
use crate::gate::require_role;
use crate::models::{
    AttendanceRecord, FeeRecord, HomeworkAssignment, Notice, Student, TestResult,
};
use crate::AppState;

async fn current_user_id(claims: &Claims, db: &sqlx::PgPool) -> Result<i32, HttpResponse> {
    match sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE username = $1")
        .bind(&claims.sub)
        .fetch_optional(db)
        .await
    {
        Ok(Some(id)) => Ok(id),
        Ok(None) => Err(HttpResponse::Unauthorized().json(json!({
            "error": "User not found"
        }))),
        Err(e) => {
            error!("Database error: {}", e);
            Err(HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            })))
        }
    }
}

async fn linked_children(db: &sqlx::PgPool, user_id: i32) -> Result<Vec<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(
        "SELECT id, first_name, last_name, class_label, date_of_birth, email,
                parent_name, parent_phone, address, parent_user_id, created_at, updated_at
         FROM students WHERE parent_user_id = $1 ORDER BY first_name",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

#[get("/children")]
async fn children(req: HttpRequest, app_state: web::Data<AppState>) -> impl Responder {
    let claims = match require_role(&req, &app_state, &["parent"]).await {
        Ok(claims) => claims,
        Err(response) => return response,
    };

    let user_id = match current_user_id(&claims, &app_state.db).await {
        Ok(id) => id,
        Err(response) => return response,
    };

    match linked_children(&app_state.db, user_id).await {
        Ok(students) => HttpResponse::Ok().json(students),
        Err(e) => {
            error!("Failed to fetch children: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to fetch children"
            }))
        }
    }
}

#[get("/homework")]
async fn child_homework(req: HttpRequest, app_state: web::Data<AppState>) -> impl Responder {
    let claims = match require_role(&req, &app_state, &["parent"]).await {
        Ok(claims) => claims,
        Err(response) => return response,
    };

    let user_id = match current_user_id(&claims, &app_state.db).await {
        Ok(id) => id,
        Err(response) => return response,
    };

    let linked = match linked_children(&app_state.db, user_id).await {
        Ok(students) => students,
        Err(e) => {
            error!("Failed to fetch children: {}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Failed to fetch homework"
            }));
        }
    };

    let class_labels: Vec<String> = linked.into_iter().map(|c| c.class_label).collect();

    let result = sqlx::query_as::<_, HomeworkAssignment>(
        "SELECT id, title, subject, class_label, description, assigned_date, due_date,
                assigned_by, created_at, updated_at
         FROM homework WHERE class_label = ANY($1)
         ORDER BY assigned_date DESC, id DESC",
    )
    .bind(&class_labels)
    .fetch_all(&app_state.db)
    .await;

    match result {
        Ok(assignments) => HttpResponse::Ok().json(assignments),
        Err(e) => {
            error!("Failed to fetch homework: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to fetch homework"
            }))
        }
    }
}

#[get("/attendance")]
async fn child_attendance(req: HttpRequest, app_state: web::Data<AppState>) -> impl Responder {
    let claims = match require_role(&req, &app_state, &["parent"]).await {
        Ok(claims) => claims,
        Err(response) => return response,
    };

    let user_id = match current_user_id(&claims, &app_state.db).await {
        Ok(id) => id,
        Err(response) => return response,
    };

    let result = sqlx::query_as::<_, AttendanceRecord>(
        "SELECT a.id, a.date, a.class_label, a.student_id, a.student_name, a.status,
                a.created_at, a.updated_at
         FROM attendance a
         INNER JOIN students s ON a.student_id = s.id
         WHERE s.parent_user_id = $1
         ORDER BY a.date DESC, a.id DESC",
    )
    .bind(user_id)
    .fetch_all(&app_state.db)
    .await;

    match result {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => {
            error!("Failed to fetch attendance: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to fetch attendance"
            }))
        }
    }
}

#[get("/fees")]
async fn child_fees(req: HttpRequest, app_state: web::Data<AppState>) -> impl Responder {
    let claims = match require_role(&req, &app_state, &["parent"]).await {
        Ok(claims) => claims,
        Err(response) => return response,
    };

    let user_id = match current_user_id(&claims, &app_state.db).await {
        Ok(id) => id,
        Err(response) => return response,
    };

    let result = sqlx::query_as::<_, FeeRecord>(
        "SELECT f.id, f.student_id, f.student_name, f.fee_type, f.amount, f.due_date,
                f.status, f.payment_date, f.created_at, f.updated_at
         FROM fees f
         INNER JOIN students s ON f.student_id = s.id
         WHERE s.parent_user_id = $1
         ORDER BY f.due_date DESC, f.id DESC",
    )
    .bind(user_id)
    .fetch_all(&app_state.db)
    .await;

    match result {
        Ok(fees) => HttpResponse::Ok().json(fees),
        Err(e) => {
            error!("Failed to fetch fees: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to fetch fees"
            }))
        }
    }
}

#[get("/results")]
async fn child_results(req: HttpRequest, app_state: web::Data<AppState>) -> impl Responder {
    let claims = match require_role(&req, &app_state, &["parent"]).await {
        Ok(claims) => claims,
        Err(response) => return response,
    };

    let user_id = match current_user_id(&claims, &app_state.db).await {
        Ok(id) => id,
        Err(response) => return response,
    };

    let result = sqlx::query_as::<_, TestResult>(
        "SELECT t.id, t.student_id, t.student_name, t.subject, t.test_type, t.test_date,
                t.marks_obtained, t.total_marks, t.created_at, t.updated_at
         FROM test_results t
         INNER JOIN students s ON t.student_id = s.id
         WHERE s.parent_user_id = $1
         ORDER BY t.test_date DESC, t.id DESC",
    )
    .bind(user_id)
    .fetch_all(&app_state.db)
    .await;

    match result {
        Ok(results) => HttpResponse::Ok().json(results),
        Err(e) => {
            error!("Failed to fetch test results: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to fetch test results"
            }))
        }
    }
}

#[get("/notices")]
async fn parent_notices(req: HttpRequest, app_state: web::Data<AppState>) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["parent"]).await {
        return response;
    }

    let result = sqlx::query_as::<_, Notice>(
        "SELECT id, title, priority, audience, content, expiry_date, status,
                created_at, updated_at
         FROM notices
         WHERE status = 'active' AND audience IN ('all', 'parents')
         ORDER BY created_at DESC",
    )
    .fetch_all(&app_state.db)
    .await;

    match result {
        Ok(notices) => HttpResponse::Ok().json(notices),
        Err(e) => {
            error!("Failed to fetch notices: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to fetch notices"
            }))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/parent")
            .service(children)
            .service(child_homework)
            .service(child_attendance)
            .service(child_fees)
            .service(child_results)
            .service(parent_notices),
    );
}
