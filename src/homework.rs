use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use chrono::NaiveDate;
use log::error;
use serde::Deserialize;
use serde_json::json;

use crate::filters::{matches_eq, matches_search, opt};
use crate::gate::require_role;
use crate::models::{is_valid_class, is_valid_subject, HomeworkAssignment};
use crate::AppState;

#[derive(Debug, Deserialize)]
struct HomeworkListQuery {
    search: Option<String>,
    class_label: Option<String>,
    subject: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HomeworkPayload {
    pub title: String,
    pub subject: String,
    pub class_label: String,
    pub description: String,
    pub assigned_date: NaiveDate,
    pub due_date: NaiveDate,
    pub assigned_by: String,
}

fn validate_payload(payload: &HomeworkPayload) -> Result<(), HttpResponse> {
    if payload.title.trim().is_empty() || payload.description.trim().is_empty() {
        return Err(HttpResponse::BadRequest().json(json!({
            "error": "Title and description are required"
        })));
    }
    if !is_valid_subject(&payload.subject) {
        return Err(HttpResponse::BadRequest().json(json!({
            "error": "Unknown subject"
        })));
    }
    if !is_valid_class(&payload.class_label) {
        return Err(HttpResponse::BadRequest().json(json!({
            "error": "Unknown class level"
        })));
    }
    Ok(())
}

#[get("")]
async fn list_homework(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    query: web::Query<HomeworkListQuery>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    let rows = sqlx::query_as::<_, HomeworkAssignment>(
        "SELECT id, title, subject, class_label, description, assigned_date, due_date,
                assigned_by, created_at, updated_at
         FROM homework ORDER BY assigned_date DESC, id DESC",
    )
    .fetch_all(&app_state.db)
    .await;

    let rows = match rows {
        Ok(rows) => rows,
        Err(e) => {
            error!("Failed to fetch homework: {}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Failed to fetch homework"
            }));
        }
    };

    let search = query.search.as_deref().unwrap_or("");
    let assignments: Vec<HomeworkAssignment> = rows
        .into_iter()
        .filter(|h| {
            matches_search(search, &[&h.title, &h.description])
                && matches_eq(opt(&query.class_label), &h.class_label)
                && matches_eq(opt(&query.subject), &h.subject)
        })
        .collect();

    HttpResponse::Ok().json(assignments)
}

#[post("")]
async fn create_homework(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    payload: web::Json<HomeworkPayload>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    if let Err(response) = validate_payload(&payload) {
        return response;
    }

    let result = sqlx::query_scalar::<_, i32>(
        "INSERT INTO homework (title, subject, class_label, description, assigned_date,
                               due_date, assigned_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind(&payload.title)
    .bind(&payload.subject)
    .bind(&payload.class_label)
    .bind(&payload.description)
    .bind(payload.assigned_date)
    .bind(payload.due_date)
    .bind(&payload.assigned_by)
    .fetch_one(&app_state.db)
    .await;

    match result {
        Ok(id) => HttpResponse::Ok().json(json!({ "id": id })),
        Err(e) => {
            error!("Failed to create homework: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to create homework"
            }))
        }
    }
}

#[put("/{id}")]
async fn update_homework(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    homework_id: web::Path<i32>,
    payload: web::Json<HomeworkPayload>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    if let Err(response) = validate_payload(&payload) {
        return response;
    }

    let result = sqlx::query(
        "UPDATE homework
         SET title = $1, subject = $2, class_label = $3, description = $4,
             assigned_date = $5, due_date = $6, assigned_by = $7, updated_at = NOW()
         WHERE id = $8",
    )
    .bind(&payload.title)
    .bind(&payload.subject)
    .bind(&payload.class_label)
    .bind(&payload.description)
    .bind(payload.assigned_date)
    .bind(payload.due_date)
    .bind(&payload.assigned_by)
    .bind(homework_id.into_inner())
    .execute(&app_state.db)
    .await;

    match result {
        Ok(done) if done.rows_affected() > 0 => HttpResponse::Ok().json(json!({
            "message": "Homework updated successfully"
        })),
        Ok(_) => HttpResponse::NotFound().json(json!({
            "error": "Homework not found"
        })),
        Err(e) => {
            error!("Failed to update homework: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to update homework"
            }))
        }
    }
}

#[delete("/{id}")]
async fn delete_homework(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    homework_id: web::Path<i32>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    let result = sqlx::query("DELETE FROM homework WHERE id = $1")
        .bind(homework_id.into_inner())
        .execute(&app_state.db)
        .await;

    match result {
        Ok(done) if done.rows_affected() > 0 => HttpResponse::Ok().json(json!({
            "message": "Homework deleted"
        })),
        Ok(_) => HttpResponse::NotFound().json(json!({
            "error": "Homework not found"
        })),
        Err(e) => {
            error!("Failed to delete homework: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to delete homework"
            }))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/admin/homework")
            .service(list_homework)
            .service(create_homework)
            .service(update_homework)
            .service(delete_homework),
    );
}
