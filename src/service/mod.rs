pub mod favorites;
pub mod invalidation;
pub mod listings;
pub mod query;
pub mod recommendations;

pub use favorites::FavoriteService;
pub use invalidation::{Invalidator, Mutation};
pub use listings::ListingService;
pub use query::{CachedPage, QueryService};
pub use recommendations::RecommendationService;
