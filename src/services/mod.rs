pub mod batching;
pub mod catalog;
pub mod features;
pub mod neighbors;
pub mod recommendations;

pub use catalog::{CatalogGateway, SpotifyGateway};
pub use recommendations::{EngineSettings, RecommendationEngine};
