//! Discogs REST API: OAuth 1.0a token endpoints and user-scoped resources.

mod client;
mod models;

pub use client::{DiscogsAuth, DiscogsClient, ListQuery, PLACEHOLDER_USERNAME};
pub use models::{ArtistInfo, ReleaseSummary};
