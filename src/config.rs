use dotenv::dotenv;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub cache_enabled: bool,
    pub cache_ttl: Duration,
    pub cache_max_capacity: u64,
    pub max_page_size: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:listings.db".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
            cache_enabled: true,
            cache_ttl: Duration::from_secs(300),
            cache_max_capacity: 10_000,
            max_page_size: 100,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();
        let defaults = Self::default();

        let database_url = env::var("DATABASE_URL").unwrap_or(defaults.database_url);
        let server_host = env::var("SERVER_HOST").unwrap_or(defaults.server_host);
        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.server_port);
        let cache_enabled = env::var("CACHE_ENABLED")
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "off"))
            .unwrap_or(defaults.cache_enabled);
        let cache_ttl = env::var("CACHE_TTL")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_ttl);
        let cache_max_capacity = env::var("CACHE_MAX_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.cache_max_capacity);
        let max_page_size = env::var("MAX_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n: &i64| *n > 0)
            .unwrap_or(defaults.max_page_size);

        Self {
            database_url,
            server_host,
            server_port,
            cache_enabled,
            cache_ttl,
            cache_max_capacity,
            max_page_size,
        }
    }
}
