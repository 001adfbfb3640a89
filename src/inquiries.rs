use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use log::error;
use serde::Deserialize;
use serde_json::json;

use crate::filters::{matches_eq, matches_search, opt};
use crate::gate::require_role;
use crate::models::{Inquiry, InquiryStatus};
use crate::validate::email_is_valid;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Public contact form. Everything lands with status `new`; status only ever
/// advances through the admin panel.
#[post("/api/inquiries")]
async fn submit_inquiry(
    app_state: web::Data<AppState>,
    payload: web::Json<ContactRequest>,
) -> impl Responder {
    if payload.name.trim().is_empty() || payload.message.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "error": "Name and message are required"
        }));
    }
    if !email_is_valid(&payload.email) {
        return HttpResponse::BadRequest().json(json!({
            "error": "Invalid email address"
        }));
    }

    let result = sqlx::query_scalar::<_, i32>(
        "INSERT INTO inquiries (name, email, message) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(payload.name.trim())
    .bind(&payload.email)
    .bind(payload.message.trim())
    .fetch_one(&app_state.db)
    .await;

    match result {
        Ok(id) => HttpResponse::Ok().json(json!({ "id": id })),
        Err(e) => {
            error!("Failed to record inquiry: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to record inquiry"
            }))
        }
    }
}

#[derive(Debug, Deserialize)]
struct InquiryListQuery {
    search: Option<String>,
    status: Option<String>,
}

#[get("")]
async fn list_inquiries(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    query: web::Query<InquiryListQuery>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    let rows = sqlx::query_as::<_, Inquiry>(
        "SELECT id, name, email, message, status, created_at, updated_at
         FROM inquiries ORDER BY created_at DESC",
    )
    .fetch_all(&app_state.db)
    .await;

    let rows = match rows {
        Ok(rows) => rows,
        Err(e) => {
            error!("Failed to fetch inquiries: {}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Failed to fetch inquiries"
            }));
        }
    };

    let search = query.search.as_deref().unwrap_or("");
    let inquiries: Vec<Inquiry> = rows
        .into_iter()
        .filter(|i| {
            matches_search(search, &[&i.name, &i.email, &i.message])
                && matches_eq(opt(&query.status), i.status.as_str())
        })
        .collect();

    HttpResponse::Ok().json(inquiries)
}

#[derive(Debug, Deserialize)]
struct UpdateInquiryStatusRequest {
    status: InquiryStatus,
}

#[put("/{id}/status")]
async fn update_inquiry_status(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    inquiry_id: web::Path<i32>,
    payload: web::Json<UpdateInquiryStatusRequest>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    let result = sqlx::query(
        "UPDATE inquiries SET status = $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(payload.status)
    .bind(inquiry_id.into_inner())
    .execute(&app_state.db)
    .await;

    match result {
        Ok(done) if done.rows_affected() > 0 => HttpResponse::Ok().json(json!({
            "message": "Inquiry status updated"
        })),
        Ok(_) => HttpResponse::NotFound().json(json!({
            "error": "Inquiry not found"
        })),
        Err(e) => {
            error!("Failed to update inquiry: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to update inquiry"
            }))
        }
    }
}

#[delete("/{id}")]
async fn delete_inquiry(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    inquiry_id: web::Path<i32>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    let result = sqlx::query("DELETE FROM inquiries WHERE id = $1")
        .bind(inquiry_id.into_inner())
        .execute(&app_state.db)
        .await;

    match result {
        Ok(done) if done.rows_affected() > 0 => HttpResponse::Ok().json(json!({
            "message": "Inquiry deleted"
        })),
        Ok(_) => HttpResponse::NotFound().json(json!({
            "error": "Inquiry not found"
        })),
        Err(e) => {
            error!("Failed to delete inquiry: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to delete inquiry"
            }))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(submit_inquiry);
    cfg.service(
        web::scope("/api/admin/inquiries")
            .service(list_inquiries)
            .service(update_inquiry_status)
            .service(delete_inquiry),
    );
}
