use sqlx::{Pool, Row, Sqlite};

use crate::db::listing::{listing_from_row, LISTING_COLUMNS};
use crate::db::from_timestamp;
use crate::models::{Recommendation, UserSummary};

pub async fn add_recommendation(
    pool: &Pool<Sqlite>,
    listing_row_id: i64,
    from_user: &str,
    to_user: &str,
    message: &str,
    created_at: i64,
) -> Result<i64, sqlx::Error> {
    let id = sqlx::query(
        "INSERT INTO recommendations (listing_id, from_user, to_user, message, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(listing_row_id)
    .bind(from_user)
    .bind(to_user)
    .bind(message)
    .bind(created_at)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

/// Recommendations addressed to `to_user`, newest first.
/// The property is `None` once its listing has been deleted.
pub async fn recommendations_for(pool: &Pool<Sqlite>, to_user: &str) -> Result<Vec<Recommendation>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"SELECT r.id AS recommendation_id, r.to_user AS to_user, r.message AS message,
                  r.created_at AS recommended_at,
                  s.id AS sender_id, s.name AS sender_name, s.email AS sender_email,
                  {}
           FROM recommendations r
           JOIN users s ON s.id = r.from_user
           LEFT JOIN listings l ON l.row_id = r.listing_id
           LEFT JOIN users u ON u.id = l.created_by
           WHERE r.to_user = ?
           ORDER BY r.created_at DESC, r.id DESC"#,
        LISTING_COLUMNS
    ))
    .bind(to_user)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> Result<Recommendation, sqlx::Error> {
            let property = match row.try_get::<Option<i64>, _>("row_id")? {
                Some(_) => Some(listing_from_row(row)?),
                None => None,
            };

            Ok(Recommendation {
                id: row.try_get("recommendation_id")?,
                property,
                from_user: UserSummary {
                    id: row.try_get("sender_id")?,
                    name: row.try_get("sender_name")?,
                    email: row.try_get("sender_email")?,
                },
                to_user: row.try_get("to_user")?,
                message: row.try_get("message")?,
                created_at: from_timestamp(row.try_get("recommended_at")?),
            })
        })
        .collect()
}
