use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use chrono::NaiveDate;
use log::error;
use serde::Deserialize;
use serde_json::json;

use crate::filters::{matches_eq, matches_search, opt};
use crate::gate::require_role;
use crate::models::{FeeRecord, FeeStatus, FeeType};
use crate::AppState;

#[derive(Debug, Deserialize)]
struct FeeListQuery {
    search: Option<String>,
    status: Option<String>,
    fee_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeePayload {
    pub student_id: i32,
    pub fee_type: FeeType,
    pub amount: i32,
    pub due_date: NaiveDate,
    pub status: FeeStatus,
    pub payment_date: Option<NaiveDate>,
}

fn validate_payload(payload: &FeePayload) -> Result<(), HttpResponse> {
    if payload.amount <= 0 {
        return Err(HttpResponse::BadRequest().json(json!({
            "error": "Amount must be positive"
        })));
    }
    // Every entry point enforces the same rule: a paid or partial fee must
    // carry its payment date.
    if payload.status != FeeStatus::Pending && payload.payment_date.is_none() {
        return Err(HttpResponse::BadRequest().json(json!({
            "error": "Payment date is required when the fee is not pending"
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
async fn list_fees(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    query: web::Query<FeeListQuery>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    let rows = sqlx::query_as::<_, FeeRecord>(
        "SELECT id, student_id, student_name, fee_type, amount, due_date, status,
                payment_date, created_at, updated_at
         FROM fees ORDER BY due_date DESC, id DESC",
    )
    .fetch_all(&app_state.db)
    .await;

    let rows = match rows {
        Ok(rows) => rows,
        Err(e) => {
            error!("Failed to fetch fees: {}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Failed to fetch fees"
            }));
        }
    };

    let search = query.search.as_deref().unwrap_or("");
    let fees: Vec<FeeRecord> = rows
        .into_iter()
        .filter(|f| {
            matches_search(search, &[&f.student_name])
                && matches_eq(opt(&query.status), f.status.as_str())
                && matches_eq(opt(&query.fee_type), f.fee_type.as_str())
        })
        .collect();

    HttpResponse::Ok().json(fees)
}

#[post("")]
async fn create_fee(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    payload: web::Json<FeePayload>,
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
        "INSERT INTO fees (student_id, student_name, fee_type, amount, due_date, status, payment_date)
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind(payload.student_id)
    .bind(&student_name)
    .bind(payload.fee_type)
    .bind(payload.amount)
    .bind(payload.due_date)
    .bind(payload.status)
    .bind(payload.payment_date)
    .fetch_one(&app_state.db)
    .await;

    match result {
        Ok(id) => HttpResponse::Ok().json(json!({ "id": id })),
        Err(e) => {
            error!("Failed to create fee record: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to create fee record"
            }))
        }
    }
}

#[put("/{id}")]
async fn update_fee(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    fee_id: web::Path<i32>,
    payload: web::Json<FeePayload>,
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
        "UPDATE fees
         SET student_id = $1, student_name = $2, fee_type = $3, amount = $4,
             due_date = $5, status = $6, payment_date = $7, updated_at = NOW()
         WHERE id = $8",
    )
    .bind(payload.student_id)
    .bind(&student_name)
    .bind(payload.fee_type)
    .bind(payload.amount)
    .bind(payload.due_date)
    .bind(payload.status)
    .bind(payload.payment_date)
    .bind(fee_id.into_inner())
    .execute(&app_state.db)
    .await;

    match result {
        Ok(done) if done.rows_affected() > 0 => HttpResponse::Ok().json(json!({
            "message": "Fee record updated successfully"
        })),
        Ok(_) => HttpResponse::NotFound().json(json!({
            "error": "Fee record not found"
        })),
        Err(e) => {
            error!("Failed to update fee record: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to update fee record"
            }))
        }
    }
}

#[delete("/{id}")]
async fn delete_fee(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    fee_id: web::Path<i32>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    let result = sqlx::query("DELETE FROM fees WHERE id = $1")
        .bind(fee_id.into_inner())
        .execute(&app_state.db)
        .await;

    match result {
        Ok(done) if done.rows_affected() > 0 => HttpResponse::Ok().json(json!({
            "message": "Fee record deleted"
        })),
        Ok(_) => HttpResponse::NotFound().json(json!({
            "error": "Fee record not found"
        })),
        Err(e) => {
            error!("Failed to delete fee record: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to delete fee record"
            }))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/admin/fees")
            .service(list_fees)
            .service(create_fee)
            .service(update_fee)
            .service(delete_fee),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(status: FeeStatus, payment_date: Option<&str>) -> FeePayload {
        FeePayload {
            student_id: 1,
            fee_type: FeeType::Tuition,
            amount: 3000,
            due_date: "2024-04-01".parse().unwrap(),
            status,
            payment_date: payment_date.map(|d| d.parse().unwrap()),
        }
    }

    #[test]
    fn pending_fee_needs_no_payment_date() {
        assert!(validate_payload(&payload(FeeStatus::Pending, None)).is_ok());
    }

    #[test]
    fn paid_and_partial_fees_require_payment_date() {
        assert!(validate_payload(&payload(FeeStatus::Paid, None)).is_err());
        assert!(validate_payload(&payload(FeeStatus::Partial, None)).is_err());
        assert!(validate_payload(&payload(FeeStatus::Paid, Some("2024-03-28"))).is_ok());
    }

    #[test]
    fn amount_must_be_positive() {
        let mut p = payload(FeeStatus::Pending, None);
        p.amount = 0;
        assert!(validate_payload(&p).is_err());
    }
}
