use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHasher};
use chrono::NaiveDate;
use log::error;
use serde::Deserialize;
use serde_json::json;

use crate::filters::{matches_eq, matches_search, opt};
use crate::gate::require_role;
use crate::models::{is_valid_class, Student};
use crate::validate::email_is_valid;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct StudentListQuery {
    search: Option<String>,
    class_label: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StudentPayload {
    pub first_name: String,
    pub last_name: String,
    pub class_label: String,
    pub date_of_birth: NaiveDate,
    pub email: String,
    pub parent_name: String,
    pub parent_phone: String,
    pub address: String,
    /// When present at creation time, a parent login is provisioned with the
    /// student email as its username.
    pub parent_password: Option<String>,
}

fn validate_payload(payload: &StudentPayload) -> Result<(), HttpResponse> {
    if payload.first_name.trim().is_empty() || payload.last_name.trim().is_empty() {
        return Err(HttpResponse::BadRequest().json(json!({
            "error": "First and last name are required"
        })));
    }
    if !is_valid_class(&payload.class_label) {
        return Err(HttpResponse::BadRequest().json(json!({
            "error": "Unknown class level"
        })));
    }
    if !email_is_valid(&payload.email) {
        return Err(HttpResponse::BadRequest().json(json!({
            "error": "Invalid email address"
        })));
    }
    if payload.parent_name.trim().is_empty() || payload.parent_phone.trim().is_empty() {
        return Err(HttpResponse::BadRequest().json(json!({
            "error": "Parent name and contact are required"
        })));
    }
    Ok(())
}

#[get("")]
async fn list_students(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    query: web::Query<StudentListQuery>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    // Whole collection, newest first; narrowing happens in process.
    let rows = sqlx::query_as::<_, Student>(
        "SELECT id, first_name, last_name, class_label, date_of_birth, email,
                parent_name, parent_phone, address, parent_user_id, created_at, updated_at
         FROM students ORDER BY created_at DESC",
    )
    .fetch_all(&app_state.db)
    .await;

    let rows = match rows {
        Ok(rows) => rows,
        Err(e) => {
            error!("Failed to fetch students: {}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Failed to fetch students"
            }));
        }
    };

    let search = query.search.as_deref().unwrap_or("");
    let students: Vec<Student> = rows
        .into_iter()
        .filter(|s| {
            matches_search(search, &[&s.full_name(), &s.email, &s.parent_name])
                && matches_eq(opt(&query.class_label), &s.class_label)
        })
        .collect();

    HttpResponse::Ok().json(students)
}

#[post("")]
async fn create_student(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    payload: web::Json<StudentPayload>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    if let Err(response) = validate_payload(&payload) {
        return response;
    }

    // Student row and optional parent login commit together or not at all.
    let mut tx = match app_state.db.begin().await {
        Ok(tx) => tx,
        Err(e) => {
            error!("Failed to start transaction: {}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Database error"
            }));
        }
    };

    let mut parent_user_id: Option<i32> = None;

    if let Some(password) = payload.parent_password.as_deref() {
        if password.len() < 6 {
            let _ = tx.rollback().await;
            return HttpResponse::BadRequest().json(json!({
                "error": "Parent password must be at least 6 characters"
            }));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = match Argon2::default().hash_password(password.as_bytes(), &salt) {
            Ok(hash) => hash.to_string(),
            Err(e) => {
                error!("Password hashing error: {}", e);
                let _ = tx.rollback().await;
                return HttpResponse::InternalServerError().json(json!({
                    "error": "Failed to hash password"
                }));
            }
        };

        let user_result = sqlx::query_scalar::<_, i32>(
            "INSERT INTO users (username, password_hash, name, email, phone)
             VALUES ($1, $2, $3, $1, $4) RETURNING id",
        )
        .bind(&payload.email)
        .bind(&password_hash)
        .bind(payload.parent_name.trim())
        .bind(&payload.parent_phone)
        .fetch_one(&mut *tx)
        .await;

        let user_id = match user_result {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to create parent login: {}", e);
                let _ = tx.rollback().await;
                return HttpResponse::Conflict().json(json!({
                    "error": "A login with this email already exists"
                }));
            }
        };

        if let Err(e) = sqlx::query(
            "INSERT INTO user_roles (user_id, role_id)
             SELECT $1, id FROM roles WHERE name = 'parent'",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        {
            error!("Failed to assign parent role: {}", e);
            let _ = tx.rollback().await;
            return HttpResponse::InternalServerError().json(json!({
                "error": "Failed to create parent login"
            }));
        }

        parent_user_id = Some(user_id);
    }

    let insert_result = sqlx::query_scalar::<_, i32>(
        "INSERT INTO students (first_name, last_name, class_label, date_of_birth, email,
                               parent_name, parent_phone, address, parent_user_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
    )
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.class_label)
    .bind(payload.date_of_birth)
    .bind(&payload.email)
    .bind(&payload.parent_name)
    .bind(&payload.parent_phone)
    .bind(&payload.address)
    .bind(parent_user_id)
    .fetch_one(&mut *tx)
    .await;

    let student_id = match insert_result {
        Ok(id) => id,
        Err(e) => {
            error!("Failed to create student: {}", e);
            let _ = tx.rollback().await;
            return HttpResponse::InternalServerError().json(json!({
                "error": "Failed to create student"
            }));
        }
    };

    if let Err(e) = tx.commit().await {
        error!("Failed to commit student creation: {}", e);
        return HttpResponse::InternalServerError().json(json!({
            "error": "Failed to create student"
        }));
    }

    HttpResponse::Ok().json(json!({ "id": student_id }))
}

#[put("/{id}")]
async fn update_student(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    student_id: web::Path<i32>,
    payload: web::Json<StudentPayload>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    if let Err(response) = validate_payload(&payload) {
        return response;
    }

    // Whole-record overwrite. Names already denormalized onto attendance
    // and test-result rows are deliberately left untouched.
    let result = sqlx::query(
        "UPDATE students
         SET first_name = $1, last_name = $2, class_label = $3, date_of_birth = $4,
             email = $5, parent_name = $6, parent_phone = $7, address = $8,
             updated_at = NOW()
         WHERE id = $9",
    )
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.class_label)
    .bind(payload.date_of_birth)
    .bind(&payload.email)
    .bind(&payload.parent_name)
    .bind(&payload.parent_phone)
    .bind(&payload.address)
    .bind(student_id.into_inner())
    .execute(&app_state.db)
    .await;

    match result {
        Ok(done) if done.rows_affected() > 0 => HttpResponse::Ok().json(json!({
            "message": "Student updated successfully"
        })),
        Ok(_) => HttpResponse::NotFound().json(json!({
            "error": "Student not found"
        })),
        Err(e) => {
            error!("Failed to update student: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to update student"
            }))
        }
    }
}

#[delete("/{id}")]
async fn delete_student(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    student_id: web::Path<i32>,
) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    let result = sqlx::query("DELETE FROM students WHERE id = $1")
        .bind(student_id.into_inner())
        .execute(&app_state.db)
        .await;

    match result {
        Ok(done) if done.rows_affected() > 0 => HttpResponse::Ok().json(json!({
            "message": "Student deleted successfully"
        })),
        Ok(_) => HttpResponse::NotFound().json(json!({
            "error": "Student not found"
        })),
        Err(e) => {
            error!("Failed to delete student: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to delete student"
            }))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/admin/students")
            .service(list_students)
            .service(create_student)
            .service(update_student)
            .service(delete_student),
    );
}
