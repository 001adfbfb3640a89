pub mod attendance;
pub mod auth;
pub mod chatbot;
pub mod export;
pub mod fees;
pub mod filters;
pub mod gate;
pub mod homework;
pub mod inquiries;
pub mod models;
pub mod notices;
pub mod overview;
pub mod parent;
pub mod students;
pub mod test_results;
pub mod validate;
pub mod waitlist;

use actix_cors::Cors;
use actix_web::{middleware, web, App};
use sqlx::postgres::PgPool;
use std::sync::Arc;

use gate::RoleCache;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_secret: String,
    pub role_cache: Arc<RoleCache>,
}

pub fn create_app(
    app_state: web::Data<AppState>,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(app_state)
        .wrap(
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600),
        )
        .wrap(middleware::Logger::default())
        .configure(auth::configure)
        .configure(students::configure)
        .configure(attendance::configure)
        .configure(fees::configure)
        .configure(homework::configure)
        .configure(notices::configure)
        .configure(test_results::configure)
        .configure(inquiries::configure)
        .configure(overview::configure)
        .configure(export::configure)
        .configure(parent::configure)
        .configure(waitlist::configure)
        .configure(chatbot::configure)
}

pub async fn init_db(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPool::connect(database_url).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
