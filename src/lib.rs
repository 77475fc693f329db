// Provider authentication: OAuth 1.0a signing, handshake state machines
pub mod auth;

// Configuration (TOML file + environment overlay)
pub mod config;

// Error taxonomy
pub mod error;

// Signed-cookie sessions
pub mod session;

// Upstream API clients
pub mod discogs;
pub mod spotify;

// HTTP routes
pub mod api;
