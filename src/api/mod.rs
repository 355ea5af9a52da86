pub mod auth;
pub mod error;
pub mod response;
pub mod route;

pub use auth::AuthUser;
pub use error::ApiError;
pub use route::create_router;
