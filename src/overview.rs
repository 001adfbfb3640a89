use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use log::error;
use serde::Serialize;
use serde_json::json;

use crate::gate::require_role;
use crate::AppState;

const RECENT_WINDOW: usize = 10;

#[derive(Debug, Serialize, Clone)]
pub struct RecentChange {
    pub collection: &'static str,
    pub id: i32,
    pub label: String,
    pub changed_at: DateTime<Utc>,
}

/// Merge already-fetched per-collection change lists into one feed, newest
/// first, truncated to `limit`. Ties keep the input order.
pub fn merge_recent(sources: Vec<Vec<RecentChange>>, limit: usize) -> Vec<RecentChange> {
    let mut merged: Vec<RecentChange> = sources.into_iter().flatten().collect();
    merged.sort_by(|a, b| b.changed_at.cmp(&a.changed_at));
    merged.truncate(limit);
    merged
}

type ChangeRow = (i32, String, DateTime<Utc>);

async fn fetch_changes(
    db: &sqlx::PgPool,
    collection: &'static str,
    sql: &str,
) -> Result<Vec<RecentChange>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ChangeRow>(sql).fetch_all(db).await?;
    Ok(rows
        .into_iter()
        .map(|(id, label, changed_at)| RecentChange {
            collection,
            id,
            label,
            changed_at,
        })
        .collect())
}

#[get("/api/admin/overview")]
async fn overview(req: HttpRequest, app_state: web::Data<AppState>) -> impl Responder {
    if let Err(response) = require_role(&req, &app_state, &["admin"]).await {
        return response;
    }

    let db = &app_state.db;

    let counts_result: Result<(i64, i64, i64, i64), sqlx::Error> = async {
        let students = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students")
            .fetch_one(db)
            .await?;
        let pending_fees =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM fees WHERE status = 'pending'")
                .fetch_one(db)
                .await?;
        let active_notices =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notices WHERE status = 'active'")
                .fetch_one(db)
                .await?;
        let new_inquiries =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM inquiries WHERE status = 'new'")
                .fetch_one(db)
                .await?;
        Ok((students, pending_fees, active_notices, new_inquiries))
    }
    .await;

    let (students, pending_fees, active_notices, new_inquiries) = match counts_result {
        Ok(counts) => counts,
        Err(e) => {
            error!("Failed to fetch overview counts: {}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Failed to fetch overview"
            }));
        }
    };

    // Five collections feed the recent-changes list; each contributes its
    // latest rows and the merge keeps the newest ten overall.
    let changes_result: Result<Vec<Vec<RecentChange>>, sqlx::Error> = async {
        Ok(vec![
            fetch_changes(
                db,
                "students",
                "SELECT id, first_name || ' ' || last_name, updated_at
                 FROM students ORDER BY updated_at DESC LIMIT 10",
            )
            .await?,
            fetch_changes(
                db,
                "attendance",
                "SELECT id, student_name, updated_at
                 FROM attendance ORDER BY updated_at DESC LIMIT 10",
            )
            .await?,
            fetch_changes(
                db,
                "fees",
                "SELECT id, student_name, updated_at
                 FROM fees ORDER BY updated_at DESC LIMIT 10",
            )
            .await?,
            fetch_changes(
                db,
                "homework",
                "SELECT id, title, updated_at
                 FROM homework ORDER BY updated_at DESC LIMIT 10",
            )
            .await?,
            fetch_changes(
                db,
                "notices",
                "SELECT id, title, updated_at
                 FROM notices ORDER BY updated_at DESC LIMIT 10",
            )
            .await?,
        ])
    }
    .await;

    let recent = match changes_result {
        Ok(sources) => merge_recent(sources, RECENT_WINDOW),
        Err(e) => {
            error!("Failed to fetch recent changes: {}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Failed to fetch overview"
            }));
        }
    };

    HttpResponse::Ok().json(json!({
        "counts": {
            "students": students,
            "pending_fees": pending_fees,
            "active_notices": active_notices,
            "new_inquiries": new_inquiries,
        },
        "recent_changes": recent,
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(overview);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn change(collection: &'static str, id: i32, ts: i64) -> RecentChange {
        RecentChange {
            collection,
            id,
            label: format!("{}-{}", collection, id),
            changed_at: Utc.timestamp_opt(ts, 0).unwrap(),
        }
    }

    #[test]
    fn merges_newest_first_across_collections() {
        let merged = merge_recent(
            vec![
                vec![change("students", 1, 100), change("students", 2, 50)],
                vec![change("fees", 7, 75)],
                vec![change("notices", 3, 120)],
            ],
            10,
        );
        let order: Vec<_> = merged.iter().map(|c| (c.collection, c.id)).collect();
        assert_eq!(
            order,
            vec![("notices", 3), ("students", 1), ("fees", 7), ("students", 2)]
        );
    }

    #[test]
    fn truncates_to_window() {
        let source: Vec<RecentChange> = (0..20).map(|i| change("students", i, i as i64)).collect();
        let merged = merge_recent(vec![source], 10);
        assert_eq!(merged.len(), 10);
        assert_eq!(merged[0].id, 19);
    }

    #[test]
    fn empty_sources_yield_empty_feed() {
        assert!(merge_recent(vec![vec![], vec![]], 10).is_empty());
    }
}
