use actix_web::{web, HttpServer};
use classbridge_backend::{create_app, gate::RoleCache, init_db, AppState};
use std::env;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    // Optional .env in the working directory; real deployments set the
    // variables in the environment.
    dotenv::dotenv().ok();

    let database_url = env::var("DATABASE_URL").map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "DATABASE_URL environment variable is required",
        )
    })?;

    let jwt_secret = env::var("JWT_SECRET").map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "JWT_SECRET environment variable is required",
        )
    })?;

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    let db_pool = init_db(&database_url).await.map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to initialize database: {}", e),
        )
    })?;

    println!("Database initialized successfully");

    let app_state = web::Data::new(AppState {
        db: db_pool,
        jwt_secret,
        role_cache: Arc::new(RoleCache::new()),
    });

    println!("Starting server at http://{}", bind_addr);

    HttpServer::new(move || create_app(app_state.clone()))
        .bind(&bind_addr)?
        .run()
        .await
}
