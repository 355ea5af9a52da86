use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};
use uuid::Uuid;

use crate::db::{from_timestamp, now_timestamp};
use crate::models::User;

fn user_from_row(row: &SqliteRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        created_at: from_timestamp(row.try_get("created_at")?),
    })
}

pub async fn create_user(pool: &Pool<Sqlite>, email: &str, name: &str) -> Result<User, sqlx::Error> {
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: email.trim().to_string(),
        name: name.trim().to_string(),
        created_at: from_timestamp(now_timestamp()),
    };

    sqlx::query("INSERT INTO users (id, email, name, created_at) VALUES (?, ?, ?, ?)")
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.created_at.timestamp())
        .execute(pool)
        .await?;

    Ok(user)
}

pub async fn find_by_id(pool: &Pool<Sqlite>, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query("SELECT id, email, name, created_at FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .as_ref()
        .map(user_from_row)
        .transpose()
}

pub async fn find_by_email(pool: &Pool<Sqlite>, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query("SELECT id, email, name, created_at FROM users WHERE email = ?")
        .bind(email.trim())
        .fetch_optional(pool)
        .await?
        .as_ref()
        .map(user_from_row)
        .transpose()
}
