use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use log::error;
use serde::Deserialize;
use serde_json::json;

use crate::gate::require_role;
use crate::models::WaitlistEntry;
use crate::validate::{email_is_valid, normalize_phone};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WaitlistRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub source: Option<String>,
}

/// Write-once lead capture from the welcome popup. All validation happens
/// before the store is touched.
#[post("/api/waitlist")]
async fn join_waitlist(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    payload: web::Json<WaitlistRequest>,
) -> impl Responder {
    if payload.name.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "error": "Name is required"
        }));
    }
    if !email_is_valid(&payload.email) {
        return HttpResponse::BadRequest().json(json!({
            "error": "Invalid email address"
        }));
    }
    let phone = match normalize_phone(&payload.phone) {
        Some(phone) => phone,
        None => {
            return HttpResponse::BadRequest().json(json!({
                "error": "Phone number must contain exactly 10 digits"
            }));
        }
    };

    let user_agent = req
        .headers()
        .get("User-Agent")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let source = payload
        .source
        .clone()
        .unwrap_or_else(|| "welcome_popup".to_string());

    // Redundant human-readable date alongside the server timestamp.
    let submitted_on = Utc::now().format("%B %e, %Y").to_string();

    let result = sqlx::query_scalar::<_, i32>(
        "INSERT INTO waitlist (name, email, phone, address, source, user_agent, submitted_on)
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind(payload.name.trim())
    .bind(&payload.email)
    .bind(&phone)
    .bind(&payload.address)
    .bind(&source)
    .bind(&user_agent)
    .bind(&submitted_on)
    .fetch_one(&app_state.db)
    .await;

    match result {
        Ok(id) => HttpResponse::Ok().json(json!({
            "id": id,
            "message": "You're on the list!"
        })),
        Err(e) => {
            error!("Failed to record waitlist entry: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to join the waitlist"
            }))
        }
    }
}

#[get("/api/admin/waitlist")]
async fn list_waitlist(req: HttpRequest, app_state: web::Data<AppState>) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    let rows = sqlx::query_as::<_, WaitlistEntry>(
        "SELECT id, name, email, phone, address, status, source, visible, user_agent,
                submitted_on, created_at
         FROM waitlist WHERE visible = TRUE ORDER BY created_at DESC",
    )
    .fetch_all(&app_state.db)
    .await;

    match rows {
        Ok(entries) => HttpResponse::Ok().json(entries),
        Err(e) => {
            error!("Failed to fetch waitlist: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to fetch waitlist"
            }))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(join_waitlist);
    cfg.service(list_waitlist);
}
