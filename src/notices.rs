use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use chrono::NaiveDate;
use log::error;
use serde::Deserialize;
use serde_json::json;

use crate::filters::{matches_eq, matches_search, opt};
use crate::gate::require_role;
use crate::models::{Notice, NoticeAudience, NoticePriority, NoticeStatus};
use crate::AppState;

#[derive(Debug, Deserialize)]
struct NoticeListQuery {
    search: Option<String>,
    priority: Option<String>,
    audience: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NoticePayload {
    pub title: String,
    pub priority: NoticePriority,
    pub audience: NoticeAudience,
    pub content: String,
    pub expiry_date: Option<NaiveDate>,
    pub status: NoticeStatus,
}

#[get("")]
async fn list_notices(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    query: web::Query<NoticeListQuery>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    let rows = sqlx::query_as::<_, Notice>(
        "SELECT id, title, priority, audience, content, expiry_date, status,
                created_at, updated_at
         FROM notices ORDER BY created_at DESC",
    )
    .fetch_all(&app_state.db)
    .await;

    let rows = match rows {
        Ok(rows) => rows,
        Err(e) => {
            error!("Failed to fetch notices: {}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Failed to fetch notices"
            }));
        }
    };

    let search = query.search.as_deref().unwrap_or("");
    let notices: Vec<Notice> = rows
        .into_iter()
        .filter(|n| {
            matches_search(search, &[&n.title, &n.content])
                && matches_eq(opt(&query.priority), n.priority.as_str())
                && matches_eq(opt(&query.audience), n.audience.as_str())
                && matches_eq(opt(&query.status), n.status.as_str())
        })
        .collect();

    HttpResponse::Ok().json(notices)
}

#[post("")]
async fn create_notice(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    payload: web::Json<NoticePayload>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    if payload.title.trim().is_empty() || payload.content.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "error": "Title and content are required"
        }));
    }

    let result = sqlx::query_scalar::<_, i32>(
        "INSERT INTO notices (title, priority, audience, content, expiry_date, status)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(&payload.title)
    .bind(payload.priority)
    .bind(payload.audience)
    .bind(&payload.content)
    .bind(payload.expiry_date)
    .bind(payload.status)
    .fetch_one(&app_state.db)
    .await;

    match result {
        Ok(id) => HttpResponse::Ok().json(json!({ "id": id })),
        Err(e) => {
            error!("Failed to create notice: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to create notice"
            }))
        }
    }
}

#[put("/{id}")]
async fn update_notice(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    notice_id: web::Path<i32>,
    payload: web::Json<NoticePayload>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    if payload.title.trim().is_empty() || payload.content.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "error": "Title and content are required"
        }));
    }

    let result = sqlx::query(
        "UPDATE notices
         SET title = $1, priority = $2, audience = $3, content = $4, expiry_date = $5,
             status = $6, updated_at = NOW()
         WHERE id = $7",
    )
    .bind(&payload.title)
    .bind(payload.priority)
    .bind(payload.audience)
    .bind(&payload.content)
    .bind(payload.expiry_date)
    .bind(payload.status)
    .bind(notice_id.into_inner())
    .execute(&app_state.db)
    .await;

    match result {
        Ok(done) if done.rows_affected() > 0 => HttpResponse::Ok().json(json!({
            "message": "Notice updated successfully"
        })),
        Ok(_) => HttpResponse::NotFound().json(json!({
            "error": "Notice not found"
        })),
        Err(e) => {
            error!("Failed to update notice: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to update notice"
            }))
        }
    }
}

#[delete("/{id}")]
async fn delete_notice(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    notice_id: web::Path<i32>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    let result = sqlx::query("DELETE FROM notices WHERE id = $1")
        .bind(notice_id.into_inner())
        .execute(&app_state.db)
        .await;

    match result {
        Ok(done) if done.rows_affected() > 0 => HttpResponse::Ok().json(json!({
            "message": "Notice deleted"
        })),
        Ok(_) => HttpResponse::NotFound().json(json!({
            "error": "Notice not found"
        })),
        Err(e) => {
            error!("Failed to delete notice: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to delete notice"
            }))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/admin/notices")
            .service(list_notices)
            .service(create_notice)
            .service(update_notice)
            .service(delete_notice),
    );
}
