use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::validate::email_is_valid;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,        // username (parent accounts use the student email)
    pub exp: usize,         // expiration time
    pub roles: Vec<String>, // user roles
}

/// Extract and validate the bearer JWT from a request.
/// Returns Claims if valid, or an error HttpResponse.
pub fn verify_token(req: &HttpRequest, app_state: &AppState) -> Result<Claims, HttpResponse> {
    let auth_header = req.headers().get("Authorization");

    let token = match auth_header {
        Some(header) => {
            let header_str = header.to_str().unwrap_or("");
            if header_str.starts_with("Bearer ") {
                &header_str[7..]
            } else {
                return Err(HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "Invalid authorization header"
                })));
            }
        }
        None => {
            return Err(HttpResponse::Unauthorized().json(serde_json::json!({
                "error": "Missing authorization header"
            })));
        }
    };

    let claims = match decode::<Claims>(
        token,
        &DecodingKey::from_secret(app_state.jwt_secret.as_ref()),
        &Validation::default(),
    ) {
        Ok(data) => data.claims,
        Err(_) => {
            return Err(HttpResponse::Unauthorized().json(serde_json::json!({
                "error": "Invalid token"
            })));
        }
    };

    Ok(claims)
}

/// Issue a 24-hour token for a user. Shared by login and signup.
pub fn issue_token(
    jwt_secret: &str,
    username: &str,
    roles: Vec<String>,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .expect("valid timestamp")
        .timestamp() as usize;

    let claims = Claims {
        sub: username.to_string(),
        exp: expiration,
        roles,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )
}

pub async fn fetch_roles(db: &sqlx::PgPool, user_id: i32) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT r.name FROM roles r
         INNER JOIN user_roles ur ON r.id = ur.role_id
         WHERE ur.user_id = $1",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

#[derive(Debug, FromRow)]
struct User {
    id: i32,
    #[allow(dead_code)]
    username: String,
    password_hash: String,
}

#[post("/login")]
async fn login(
    app_state: web::Data<AppState>,
    credentials: web::Json<LoginRequest>,
) -> impl Responder {
    let user_result = sqlx::query_as::<_, User>(
        "SELECT id, username, password_hash FROM users WHERE username = $1",
    )
    .bind(&credentials.username)
    .fetch_optional(&app_state.db)
    .await;

    let user = match user_result {
        Ok(Some(user)) => user,
        Ok(None) => {
            return HttpResponse::Unauthorized().json(ErrorResponse {
                error: "Invalid credentials".to_string(),
            });
        }
        Err(e) => {
            error!("Database error: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Internal server error".to_string(),
            });
        }
    };

    let parsed_hash = match PasswordHash::new(&user.password_hash) {
        Ok(hash) => hash,
        Err(e) => {
            error!("Failed to parse password hash: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Internal server error".to_string(),
            });
        }
    };

    let password_valid = Argon2::default()
        .verify_password(credentials.password.as_bytes(), &parsed_hash)
        .is_ok();

    if !password_valid {
        return HttpResponse::Unauthorized().json(ErrorResponse {
            error: "Invalid credentials".to_string(),
        });
    }

    let roles = match fetch_roles(&app_state.db, user.id).await {
        Ok(roles) => roles,
        Err(e) => {
            error!("Failed to fetch user roles: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Internal server error".to_string(),
            });
        }
    };

    // A user without any role has nothing to log in to.
    if roles.is_empty() {
        return HttpResponse::Unauthorized().json(ErrorResponse {
            error: "No role assigned to this account".to_string(),
        });
    }

    let token = match issue_token(&app_state.jwt_secret, &credentials.username, roles.clone()) {
        Ok(t) => t,
        Err(e) => {
            error!("JWT encoding error: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Could not generate token".to_string(),
            });
        }
    };

    app_state.role_cache.mark(&credentials.username);

    HttpResponse::Ok().json(LoginResponse { token, roles })
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

/// Public parent-account signup. Creates the user row and the parent role
/// link in one transaction, then issues a token straight away.
#[post("/signup")]
async fn signup(
    app_state: web::Data<AppState>,
    payload: web::Json<SignupRequest>,
) -> impl Responder {
    if payload.name.trim().is_empty() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Name is required".to_string(),
        });
    }
    if !email_is_valid(&payload.email) {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Invalid email address".to_string(),
        });
    }
    if payload.password.len() < 6 {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Password must be at least 6 characters".to_string(),
        });
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = match Argon2::default().hash_password(payload.password.as_bytes(), &salt) {
        Ok(hash) => hash.to_string(),
        Err(e) => {
            error!("Password hashing error: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to hash password".to_string(),
            });
        }
    };

    let mut tx = match app_state.db.begin().await {
        Ok(tx) => tx,
        Err(e) => {
            error!("Failed to start transaction: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Database error".to_string(),
            });
        }
    };

    let user_result = sqlx::query_scalar::<_, i32>(
        "INSERT INTO users (username, password_hash, name, email, phone)
         VALUES ($1, $2, $3, $1, $4) RETURNING id",
    )
    .bind(&payload.email)
    .bind(&password_hash)
    .bind(payload.name.trim())
    .bind(&payload.phone)
    .fetch_one(&mut *tx)
    .await;

    let user_id = match user_result {
        Ok(id) => id,
        Err(e) => {
            error!("Failed to create user: {}", e);
            let _ = tx.rollback().await;
            return HttpResponse::Conflict().json(ErrorResponse {
                error: "An account with this email already exists".to_string(),
            });
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
        return HttpResponse::InternalServerError().json(ErrorResponse {
            error: "Failed to create account".to_string(),
        });
    }

    if let Err(e) = tx.commit().await {
        error!("Failed to commit signup: {}", e);
        return HttpResponse::InternalServerError().json(ErrorResponse {
            error: "Failed to create account".to_string(),
        });
    }

    let roles = vec!["parent".to_string()];
    let token = match issue_token(&app_state.jwt_secret, &payload.email, roles.clone()) {
        Ok(t) => t,
        Err(e) => {
            error!("JWT encoding error: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Could not generate token".to_string(),
            });
        }
    };

    app_state.role_cache.mark(&payload.email);

    HttpResponse::Ok().json(LoginResponse { token, roles })
}

#[get("/validate")]
async fn validate_token_endpoint(
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> impl Responder {
    let claims = match verify_token(&req, &app_state) {
        Ok(claims) => claims,
        Err(response) => return response,
    };

    let user_exists = sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE username = $1")
        .bind(&claims.sub)
        .fetch_optional(&app_state.db)
        .await;

    match user_exists {
        Ok(Some(_)) => HttpResponse::Ok().json(serde_json::json!({
            "valid": true,
            "username": claims.sub,
            "roles": claims.roles,
        })),
        Ok(None) => {
            // Stale session: the account behind this token is gone.
            app_state.role_cache.evict(&claims.sub);
            HttpResponse::Unauthorized().json(serde_json::json!({
                "error": "User not found",
            }))
        }
        Err(e) => {
            error!("Database error: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Internal server error",
            }))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[post("/change-password")]
async fn change_password(
    app_state: web::Data<AppState>,
    req: HttpRequest,
    change_req: web::Json<ChangePasswordRequest>,
) -> impl Responder {
    let claims = match verify_token(&req, &app_state) {
        Ok(claims) => claims,
        Err(response) => return response,
    };

    let user_result = sqlx::query_as::<_, User>(
        "SELECT id, username, password_hash FROM users WHERE username = $1",
    )
    .bind(&claims.sub)
    .fetch_optional(&app_state.db)
    .await;

    let user = match user_result {
        Ok(Some(user)) => user,
        Ok(None) => {
            return HttpResponse::NotFound().json(ErrorResponse {
                error: "User not found".to_string(),
            });
        }
        Err(e) => {
            error!("Database error: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Internal server error".to_string(),
            });
        }
    };

    let parsed_hash = match PasswordHash::new(&user.password_hash) {
        Ok(hash) => hash,
        Err(e) => {
            error!("Failed to parse password hash: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Internal server error".to_string(),
            });
        }
    };

    let password_valid = Argon2::default()
        .verify_password(change_req.current_password.as_bytes(), &parsed_hash)
        .is_ok();

    if !password_valid {
        return HttpResponse::Unauthorized().json(ErrorResponse {
            error: "Current password is incorrect".to_string(),
        });
    }

    let salt = SaltString::generate(&mut OsRng);
    let new_hash = match Argon2::default().hash_password(change_req.new_password.as_bytes(), &salt)
    {
        Ok(hash) => hash.to_string(),
        Err(e) => {
            error!("Failed to hash password: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to hash password".to_string(),
            });
        }
    };

    let update_result = sqlx::query("UPDATE users SET password_hash = $1 WHERE username = $2")
        .bind(&new_hash)
        .bind(&claims.sub)
        .execute(&app_state.db)
        .await;

    match update_result {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "message": "Password changed successfully"
        })),
        Err(e) => {
            error!("Database error: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to change password".to_string(),
            })
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .service(login)
            .service(signup)
            .service(validate_token_endpoint)
            .service(change_password),
    );
}
