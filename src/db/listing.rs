use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::types::Json;
use sqlx::{Pool, QueryBuilder, Row, Sqlite};

use crate::db::{from_timestamp, from_timestamp_millis, now_timestamp};
use crate::filter::{Filter, FilterOp, FilterValue, ListingQuery};
use crate::models::{Listing, ListingFields, Location, UserSummary};

pub(crate) const LISTING_COLUMNS: &str = "\
    l.row_id AS row_id, l.external_id AS external_id, l.title AS title, \
    l.property_type AS property_type, l.price AS price, \
    l.location_state AS location_state, l.location_city AS location_city, \
    l.area_sq_ft AS area_sq_ft, l.bedrooms AS bedrooms, l.bathrooms AS bathrooms, \
    l.amenities AS amenities, l.furnished AS furnished, l.available_from AS available_from, \
    l.listed_by AS listed_by, l.tags AS tags, l.color_theme AS color_theme, \
    l.rating AS rating, l.is_verified AS is_verified, l.listing_type AS listing_type, \
    l.created_at AS created_at, l.updated_at AS updated_at, \
    u.id AS owner_id, u.name AS owner_name, u.email AS owner_email";

pub(crate) const LISTING_FROM: &str = "FROM listings l JOIN users u ON u.id = l.created_by";

pub(crate) fn listing_from_row(row: &SqliteRow) -> Result<Listing, sqlx::Error> {
    let fields = ListingFields {
        id: row.try_get("external_id")?,
        title: row.try_get("title")?,
        property_type: row.try_get("property_type")?,
        price: row.try_get("price")?,
        location: Location {
            state: row.try_get("location_state")?,
            city: row.try_get("location_city")?,
        },
        area_sq_ft: row.try_get("area_sq_ft")?,
        bedrooms: row.try_get("bedrooms")?,
        bathrooms: row.try_get("bathrooms")?,
        amenities: row.try_get::<Json<Vec<String>>, _>("amenities")?.0,
        furnished: row.try_get("furnished")?,
        available_from: row
            .try_get::<Option<i64>, _>("available_from")?
            .map(from_timestamp_millis),
        listed_by: row.try_get("listed_by")?,
        tags: row.try_get::<Json<Vec<String>>, _>("tags")?.0,
        color_theme: row.try_get("color_theme")?,
        rating: row.try_get("rating")?,
        is_verified: row.try_get("is_verified")?,
        listing_type: row.try_get("listing_type")?,
    };

    Ok(Listing {
        row_id: row.try_get("row_id")?,
        fields,
        created_by: UserSummary {
            id: row.try_get("owner_id")?,
            name: row.try_get("owner_name")?,
            email: row.try_get("owner_email")?,
        },
        created_at: from_timestamp(row.try_get("created_at")?),
        updated_at: from_timestamp(row.try_get("updated_at")?),
    })
}

/// Binds every writable column, in the order used by INSERT and UPDATE below.
fn bind_fields<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    fields: &'q ListingFields,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query
        .bind(&fields.id)
        .bind(&fields.title)
        .bind(fields.property_type)
        .bind(fields.price)
        .bind(&fields.location.state)
        .bind(&fields.location.city)
        .bind(fields.area_sq_ft)
        .bind(fields.bedrooms)
        .bind(fields.bathrooms)
        .bind(Json(&fields.amenities))
        .bind(fields.furnished)
        .bind(fields.available_from.map(|date| date.timestamp_millis()))
        .bind(fields.listed_by)
        .bind(Json(&fields.tags))
        .bind(&fields.color_theme)
        .bind(fields.rating)
        .bind(fields.is_verified)
        .bind(fields.listing_type)
}

pub async fn insert_listing(
    pool: &Pool<Sqlite>,
    owner_id: &str,
    fields: &ListingFields,
) -> Result<Listing, sqlx::Error> {
    let now = now_timestamp();

    let query = sqlx::query(
        r#"
        INSERT INTO listings
        (external_id, title, property_type, price, location_state, location_city,
         area_sq_ft, bedrooms, bathrooms, amenities, furnished, available_from,
         listed_by, tags, color_theme, rating, is_verified, listing_type,
         created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    );
    let row_id = bind_fields(query, fields)
        .bind(owner_id)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?
        .last_insert_rowid();

    find_by_row_id(pool, row_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

pub async fn update_listing(
    pool: &Pool<Sqlite>,
    row_id: i64,
    fields: &ListingFields,
) -> Result<Listing, sqlx::Error> {
    let query = sqlx::query(
        r#"
        UPDATE listings SET
            external_id = ?, title = ?, property_type = ?, price = ?,
            location_state = ?, location_city = ?, area_sq_ft = ?, bedrooms = ?,
            bathrooms = ?, amenities = ?, furnished = ?, available_from = ?,
            listed_by = ?, tags = ?, color_theme = ?, rating = ?, is_verified = ?,
            listing_type = ?, updated_at = ?
        WHERE row_id = ?
        "#,
    );
    bind_fields(query, fields)
        .bind(now_timestamp())
        .bind(row_id)
        .execute(pool)
        .await?;

    find_by_row_id(pool, row_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Deletes the listing and every favorite that references it.
/// Returns the number of favorites removed.
pub async fn delete_listing(pool: &Pool<Sqlite>, row_id: i64) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let favorites_removed = sqlx::query("DELETE FROM favorites WHERE listing_id = ?")
        .bind(row_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM listings WHERE row_id = ?")
        .bind(row_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(favorites_removed)
}

pub async fn find_by_row_id(pool: &Pool<Sqlite>, row_id: i64) -> Result<Option<Listing>, sqlx::Error> {
    sqlx::query(&format!("SELECT {} {} WHERE l.row_id = ?", LISTING_COLUMNS, LISTING_FROM))
        .bind(row_id)
        .fetch_optional(pool)
        .await?
        .as_ref()
        .map(listing_from_row)
        .transpose()
}

pub async fn find_by_external_id(pool: &Pool<Sqlite>, id: &str) -> Result<Option<Listing>, sqlx::Error> {
    sqlx::query(&format!("SELECT {} {} WHERE l.external_id = ?", LISTING_COLUMNS, LISTING_FROM))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .as_ref()
        .map(listing_from_row)
        .transpose()
}

/// Runs a search and returns one page of listings plus the total match count.
pub async fn search_listings(
    pool: &Pool<Sqlite>,
    query: &ListingQuery,
) -> Result<(Vec<Listing>, i64), sqlx::Error> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM listings l WHERE 1 = 1");
    push_conditions(&mut count, &query.filters);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {} {} WHERE 1 = 1",
        LISTING_COLUMNS, LISTING_FROM
    ));
    push_conditions(&mut select, &query.filters);
    select.push(format!(
        " ORDER BY {} {}, l.row_id ASC LIMIT ",
        query.sort.field.column(),
        if query.sort.descending { "DESC" } else { "ASC" }
    ));
    select.push_bind(query.pagination.limit);
    select.push(" OFFSET ");
    select.push_bind(query.pagination.offset());

    let rows = select.build().fetch_all(pool).await?;
    let listings = rows
        .iter()
        .map(listing_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    Ok((listings, total))
}

/// Appends one `AND` clause per filter; filters on different fields are conjunctive.
fn push_conditions(builder: &mut QueryBuilder<'_, Sqlite>, filters: &[Filter]) {
    for filter in filters {
        let column = filter.field.column();
        builder.push(" AND ");

        match &filter.value {
            FilterValue::List(items) if filter.op == FilterOp::All => {
                builder.push("(1 = 1");
                for item in items {
                    builder.push(format!(
                        " AND EXISTS (SELECT 1 FROM json_each({}) WHERE json_each.value = ",
                        column
                    ));
                    builder.push_bind(item.clone());
                    builder.push(")");
                }
                builder.push(")");
            }
            FilterValue::List(items) => {
                builder.push(format!(
                    "EXISTS (SELECT 1 FROM json_each({}) WHERE json_each.value IN (",
                    column
                ));
                let mut separated = builder.separated(", ");
                for item in items {
                    separated.push_bind(item.clone());
                }
                separated.push_unseparated("))");
            }
            FilterValue::Text(text) => {
                builder.push(format!("{} {} ", column, filter.op.sql()));
                builder.push_bind(text.clone());
            }
            FilterValue::Number(n) => {
                builder.push(format!("{} {} ", column, filter.op.sql()));
                builder.push_bind(*n);
            }
            FilterValue::Bool(b) => {
                builder.push(format!("{} {} ", column, filter.op.sql()));
                builder.push_bind(*b);
            }
            FilterValue::Date(date) => {
                builder.push(format!("{} {} ", column, filter.op.sql()));
                builder.push_bind(date.timestamp_millis());
            }
        }
    }
}
