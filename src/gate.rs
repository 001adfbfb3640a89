use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use actix_web::{HttpRequest, HttpResponse};
use log::error;
use serde_json::json;

use crate::auth::{verify_token, Claims};
use crate::AppState;

/// How long a successful liveness check for a subject stays valid before the
/// users table is consulted again.
pub const AUTH_CHECK_TTL: Duration = Duration::from_secs(60);

/// Per-subject timestamps of the last successful liveness check.
///
/// The authorization decision itself trusts the roles carried in the token;
/// the cache only throttles the "does this user still exist" query.
#[derive(Default)]
pub struct RoleCache {
    inner: Mutex<HashMap<String, Instant>>,
}

impl RoleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fresh(&self, subject: &str, ttl: Duration) -> bool {
        // A poisoned lock only means a panic elsewhere; the map itself is
        // still usable, so recover the guard instead of propagating.
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.get(subject) {
            Some(checked_at) => checked_at.elapsed() < ttl,
            None => false,
        }
    }

    pub fn mark(&self, subject: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.insert(subject.to_string(), Instant::now());
    }

    pub fn evict(&self, subject: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.remove(subject);
    }
}

/// True when the session holds at least one of the allowed roles.
pub fn role_allowed(roles: &[String], allowed: &[&str]) -> bool {
    roles.iter().any(|role| allowed.contains(&role.as_str()))
}

/// Single authorization gate for every protected route group.
///
/// Order of checks:
/// 1. Bearer token must verify — otherwise 401.
/// 2. The token's role set must intersect `allowed` — otherwise 403. This is
///    decided from the claims alone, never re-read from the database.
/// 3. Liveness: unless checked within [`AUTH_CHECK_TTL`], the subject must
///    still resolve to a users row. A missing row or a query failure evicts
///    the cache entry and fails closed with 401.
pub async fn require_role(
    req: &HttpRequest,
    app_state: &AppState,
    allowed: &[&str],
) -> Result<Claims, HttpResponse> {
    let claims = verify_token(req, app_state)?;

    if !role_allowed(&claims.roles, allowed) {
        return Err(HttpResponse::Forbidden().json(json!({
            "error": "Access restricted for this role"
        })));
    }

    if !app_state.role_cache.is_fresh(&claims.sub, AUTH_CHECK_TTL) {
        let user_exists = sqlx::query_scalar::<_, i32>(
            "SELECT id FROM users WHERE username = $1",
        )
        .bind(&claims.sub)
        .fetch_optional(&app_state.db)
        .await;

        match user_exists {
            Ok(Some(_)) => {
                app_state.role_cache.mark(&claims.sub);
            }
            Ok(None) => {
                app_state.role_cache.evict(&claims.sub);
                return Err(HttpResponse::Unauthorized().json(json!({
                    "error": "Session is no longer valid"
                })));
            }
            Err(e) => {
                error!("Liveness check failed for {}: {}", claims.sub, e);
                app_state.role_cache.evict(&claims.sub);
                return Err(HttpResponse::Unauthorized().json(json!({
                    "error": "Session is no longer valid"
                })));
            }
        }
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn role_membership() {
        assert!(role_allowed(&roles(&["admin"]), &["admin"]));
        assert!(role_allowed(&roles(&["parent", "admin"]), &["admin"]));
        assert!(!role_allowed(&roles(&["parent"]), &["admin"]));
        assert!(!role_allowed(&roles(&[]), &["admin", "parent"]));
    }

    #[test]
    fn cache_miss_until_marked() {
        let cache = RoleCache::new();
        assert!(!cache.is_fresh("admin@school", AUTH_CHECK_TTL));
        cache.mark("admin@school");
        assert!(cache.is_fresh("admin@school", AUTH_CHECK_TTL));
    }

    #[test]
    fn cache_expires_and_evicts() {
        let cache = RoleCache::new();
        cache.mark("admin@school");
        assert!(!cache.is_fresh("admin@school", Duration::from_secs(0)));
        cache.evict("admin@school");
        assert!(!cache.is_fresh("admin@school", AUTH_CHECK_TTL));
    }

    #[test]
    fn cache_survives_a_poisoned_lock() {
        use std::sync::Arc;

        let cache = Arc::new(RoleCache::new());
        let poisoner = Arc::clone(&cache);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        cache.mark("admin@school");
        assert!(cache.is_fresh("admin@school", AUTH_CHECK_TTL));
        cache.evict("admin@school");
        assert!(!cache.is_fresh("admin@school", AUTH_CHECK_TTL));
    }
}
