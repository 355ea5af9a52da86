use sqlx::SqlitePool;
use tracing::info;

const SCHEMA: [&str; 8] = [
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS listings (
        row_id INTEGER PRIMARY KEY AUTOINCREMENT,
        external_id TEXT NOT NULL UNIQUE,
        title TEXT,
        property_type TEXT,
        price REAL,
        location_state TEXT,
        location_city TEXT,
        area_sq_ft REAL,
        bedrooms INTEGER,
        bathrooms INTEGER,
        amenities TEXT NOT NULL DEFAULT '[]',
        furnished TEXT,
        available_from INTEGER,
        listed_by TEXT,
        tags TEXT NOT NULL DEFAULT '[]',
        color_theme TEXT,
        rating REAL,
        is_verified BOOLEAN NOT NULL DEFAULT 0,
        listing_type TEXT,
        created_by TEXT NOT NULL REFERENCES users(id),
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS favorites (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL REFERENCES users(id),
        listing_id INTEGER NOT NULL REFERENCES listings(row_id),
        created_at INTEGER NOT NULL,
        UNIQUE (user_id, listing_id)
    )",
    // No foreign key on listing_id: recommendations outlive deleted listings.
    "CREATE TABLE IF NOT EXISTS recommendations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        listing_id INTEGER NOT NULL,
        from_user TEXT NOT NULL REFERENCES users(id),
        to_user TEXT NOT NULL REFERENCES users(id),
        message TEXT NOT NULL DEFAULT '',
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_listings_price ON listings(price)",
    "CREATE INDEX IF NOT EXISTS idx_listings_location ON listings(location_state, location_city)",
    "CREATE INDEX IF NOT EXISTS idx_favorites_listing ON favorites(listing_id)",
    "CREATE INDEX IF NOT EXISTS idx_recommendations_to_user ON recommendations(to_user, created_at)",
];

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");

    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database migrations completed successfully");
    Ok(())
}
