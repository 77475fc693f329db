use super::DiscmasterConfig;

impl DiscmasterConfig {
    /// Overlay environment variables on top of file/default values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Overlay values from `lookup`, skipping unset or empty variables.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(v) = get("DISCOGS_CONSUMER_KEY") {
            self.discogs.consumer_key = Some(v);
        }
        if let Some(v) = get("DISCOGS_CONSUMER_SECRET") {
            self.discogs.consumer_secret = Some(v);
        }
        if let Some(v) = get("DISCOGS_USER_TOKEN") {
            self.discogs.user_token = Some(v);
        }
        if let Some(v) = get("SPOTIFY_CLIENT_ID") {
            self.spotify.client_id = Some(v);
        }
        if let Some(v) = get("SPOTIFY_CLIENT_SECRET") {
            self.spotify.client_secret = Some(v);
        }
        if let Some(v) = get("SPOTIFY_REDIRECT_URI") {
            self.spotify.redirect_uri = Some(v);
        }
        // Older deployments export the public URL under the frontend's name
        if let Some(v) = get("DISCMASTER_APP_URL").or_else(|| get("NEXT_PUBLIC_APP_URL")) {
            self.server.app_url = Some(v);
        }
        if let Some(v) = get("DISCMASTER_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Some(v) = get("DISCMASTER_COOKIE_KEY") {
            self.server.cookie_key = Some(v);
        }
        if let Some(v) = get("DISCMASTER_COOKIE_SECURE") {
            if let Ok(b) = v.parse::<bool>() {
                self.server.cookie_secure = b;
            }
        }
    }
}
