use sqlx::{Pool, Row, Sqlite};

use crate::db::listing::{listing_from_row, LISTING_COLUMNS};
use crate::db::{from_timestamp, now_timestamp};
use crate::filter::Pagination;
use crate::models::FavoriteEntry;

/// Fails with a unique-constraint violation if the pair already exists.
pub async fn add_favorite(pool: &Pool<Sqlite>, user_id: &str, listing_row_id: i64) -> Result<i64, sqlx::Error> {
    let id = sqlx::query("INSERT INTO favorites (user_id, listing_id, created_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(listing_row_id)
        .bind(now_timestamp())
        .execute(pool)
        .await?
        .last_insert_rowid();

    Ok(id)
}

pub async fn remove_favorite(pool: &Pool<Sqlite>, user_id: &str, listing_row_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND listing_id = ?")
        .bind(user_id)
        .bind(listing_row_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Distinct users holding a favorite on the listing.
pub async fn users_for_listing(pool: &Pool<Sqlite>, listing_row_id: i64) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT DISTINCT user_id FROM favorites WHERE listing_id = ? ORDER BY user_id")
        .bind(listing_row_id)
        .fetch_all(pool)
        .await
}

#[cfg(test)]
pub async fn count_for_listing(pool: &Pool<Sqlite>, listing_row_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM favorites WHERE listing_id = ?")
        .bind(listing_row_id)
        .fetch_one(pool)
        .await
}

/// One page of a user's favorites, oldest first, plus the user's total.
pub async fn list_favorites(
    pool: &Pool<Sqlite>,
    user_id: &str,
    pagination: &Pagination,
) -> Result<(Vec<FavoriteEntry>, i64), sqlx::Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorites WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query(&format!(
        r#"SELECT f.id AS favorite_id, f.created_at AS favorited_at, {}
           FROM favorites f
           JOIN listings l ON l.row_id = f.listing_id
           JOIN users u ON u.id = l.created_by
           WHERE f.user_id = ?
           ORDER BY f.id ASC
           LIMIT ? OFFSET ?"#,
        LISTING_COLUMNS
    ))
    .bind(user_id)
    .bind(pagination.limit)
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    let favorites = rows
        .iter()
        .map(|row| -> Result<FavoriteEntry, sqlx::Error> {
            Ok(FavoriteEntry {
                id: row.try_get("favorite_id")?,
                property: listing_from_row(row)?,
                created_at: from_timestamp(row.try_get("favorited_at")?),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((favorites, total))
}
