use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use log::{error, info};
use std::env;

/// Hash a password for seeding the first admin account:
///
///   INSERT INTO users (username, password_hash, name)
///     VALUES ('admin', '<hash>', 'School Admin');
///   INSERT INTO user_roles (user_id, role_id)
///     SELECT u.id, r.id FROM users u, roles r
///     WHERE u.username = 'admin' AND r.name = 'admin';
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        error!("Usage: {} <password>", args[0]);
        std::process::exit(1);
    }

    let password = &args[1];
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .expect("Failed to hash password");

    info!("{}", password_hash);
}
