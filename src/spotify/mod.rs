//! Spotify Web API: OAuth 2.0 token endpoint, resource calls and the
//! process-wide client-credentials token cache.

mod client;
mod token_cache;

pub use client::{
    AlbumSummary, ArtistName, Playlist, SpotifyClient, SpotifyTokens, TrackSummary,
    FAVORITES_PLAYLIST_DESCRIPTION, FAVORITES_PLAYLIST_NAME,
};
pub use token_cache::{CachedToken, ClientCredentialsCache};

/// Scopes requested during the authorization-code login.
pub const LOGIN_SCOPES: &[&str] = &[
    "user-read-private",
    "user-read-email",
    "user-library-read",
    "streaming",
    "user-read-playback-state",
    "user-modify-playback-state",
    "playlist-read-private",
    "playlist-modify-private",
    "playlist-modify-public",
];
