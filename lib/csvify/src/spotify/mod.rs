pub mod auth;
pub mod client;
pub mod models;

pub use auth::Session;
pub use client::{CatalogClient, CatalogClientBuilder};
pub use models::{TrackHit, UserProfile};
