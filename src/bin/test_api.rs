//! Manual smoke run: starts the API on a spare port with an in-memory
//! database and walks through the cache-coherence scenarios over HTTP.

use listing_service::{api, cache, config::Config, db, state::AppState};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::{error, info, Level};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting API smoke run...");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        ..Config::from_env()
    };
    let db_pool = db::connection::establish_connection(&config.database_url).await?;
    let cache = cache::init_cache(&config);
    let app_state = Arc::new(AppState::new(config, db_pool, cache));

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server_addr = "127.0.0.1:3333";
    let listener = tokio::net::TcpListener::bind(server_addr).await?;
    info!("Starting test server on {}", server_addr);

    let server_handle = tokio::spawn(async move {
        let app = api::create_router(app_state);
        let shutdown = async {
            shutdown_rx.await.ok();
        };
        if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
            error!("Server error: {}", e);
        }
    });

    sleep(Duration::from_millis(200)).await;

    let client = reqwest::Client::new();
    let base_url = format!("http://{}", server_addr);

    // Users
    let owner: Value = client
        .post(format!("{}/users", base_url))
        .json(&json!({ "email": "owner@example.com", "name": "Owner" }))
        .send()
        .await?
        .json()
        .await?;
    let owner_id = owner["id"].as_str().unwrap_or_default().to_string();
    let fan: Value = client
        .post(format!("{}/users", base_url))
        .json(&json!({ "email": "fan@example.com", "name": "Fan" }))
        .send()
        .await?
        .json()
        .await?;
    let fan_id = fan["id"].as_str().unwrap_or_default().to_string();
    info!("✅ Registered users {} and {}", owner_id, fan_id);

    // Listing search: miss, hit, then purge on update
    let response = client
        .post(format!("{}/properties", base_url))
        .header("X-User-Id", &owner_id)
        .json(&json!({ "id": "L1", "title": "Loft", "price": 100, "listingType": "rent" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    info!("✅ Created listing L1");

    let search_url = format!("{}/properties?price[gte]=50", base_url);
    let first = client.get(&search_url).send().await?;
    assert_eq!(first.headers()["x-cache"], "MISS");
    let second = client.get(&search_url).send().await?;
    assert_eq!(second.headers()["x-cache"], "HIT");
    info!("✅ Search served from cache on repeat");

    let response = client
        .put(format!("{}/properties/L1", base_url))
        .header("X-User-Id", &owner_id)
        .json(&json!({ "price": 10 }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let third = client.get(&search_url).send().await?;
    assert_eq!(third.headers()["x-cache"], "MISS");
    let body: Value = third.json().await?;
    assert_eq!(body["total"], 0);
    info!("✅ Update purged stale search results");

    // Favorites: add, duplicate, list, remove
    let favorite_url = format!("{}/favorites/L1", base_url);
    let response = client.post(&favorite_url).header("X-User-Id", &fan_id).send().await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = client.post(&favorite_url).header("X-User-Id", &fan_id).send().await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    info!("✅ Duplicate favorite rejected");

    let list_url = format!("{}/favorites?page=1&limit=10", base_url);
    let listed: Value = client.get(&list_url).header("X-User-Id", &fan_id).send().await?.json().await?;
    assert_eq!(listed["total"], 1);

    let response = client.delete(&favorite_url).header("X-User-Id", &fan_id).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    let listed: Value = client.get(&list_url).header("X-User-Id", &fan_id).send().await?.json().await?;
    assert_eq!(listed["total"], 0);
    info!("✅ Unfavorite visible immediately");

    shutdown_tx.send(()).ok();
    server_handle.await?;

    info!("All API smoke checks passed");
    Ok(())
}
