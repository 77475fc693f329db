//! OAuth 1.0a request signing (RFC 5849, HMAC-SHA1).
//!
//! Discogs authenticates every user-scoped call with a signed `Authorization`
//! header. The signature covers the HTTP method, the normalized base URL and
//! the sorted union of query parameters and `oauth_*` protocol parameters.

use crate::config::DiscogsConfig;
use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use uuid::Uuid;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";

/// OAuth 1.0a token (request token or access token)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenPair {
    pub key: String,
    pub secret: String,
}

/// Signs requests with the application's consumer credentials.
#[derive(Clone)]
pub struct OAuth1Signer {
    consumer_key: String,
    consumer_secret: String,
}

impl OAuth1Signer {
    /// Fails with `MissingConfig` unless both consumer key and secret are set.
    pub fn new(consumer_key: Option<&str>, consumer_secret: Option<&str>) -> Result<Self, AppError> {
        match (
            super::non_empty(consumer_key),
            super::non_empty(consumer_secret),
        ) {
            (Some(key), Some(secret)) => Ok(Self {
                consumer_key: key.to_string(),
                consumer_secret: secret.to_string(),
            }),
            _ => Err(AppError::MissingConfig("Discogs OAuth")),
        }
    }

    pub fn from_config(config: &DiscogsConfig) -> Result<Self, AppError> {
        Self::new(
            config.consumer_key.as_deref(),
            config.consumer_secret.as_deref(),
        )
    }

    /// Build the `Authorization` header for one request.
    ///
    /// `extra` carries one-time protocol parameters such as `oauth_callback`
    /// or `oauth_verifier`; they are signed and sent in the header.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        token: Option<&TokenPair>,
        extra: &[(&str, &str)],
    ) -> Result<String, AppError> {
        let nonce = Uuid::new_v4().simple().to_string();
        let timestamp = Utc::now().timestamp();
        self.authorization_header_with(method, url, token, extra, &nonce, timestamp)
    }

    /// Deterministic variant of [`authorization_header`](Self::authorization_header).
    pub fn authorization_header_with(
        &self,
        method: &str,
        url: &str,
        token: Option<&TokenPair>,
        extra: &[(&str, &str)],
        nonce: &str,
        timestamp: i64,
    ) -> Result<String, AppError> {
        let mut oauth_params: Vec<(String, String)> = vec![
            ("oauth_consumer_key".to_string(), self.consumer_key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            ("oauth_signature_method".to_string(), SIGNATURE_METHOD.to_string()),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
        ];
        if let Some(token) = token {
            oauth_params.push(("oauth_token".to_string(), token.key.clone()));
        }
        for (name, value) in extra {
            oauth_params.push((name.to_string(), value.to_string()));
        }

        let base = signature_base_string(method, url, &oauth_params)?;
        let signature = self.sign(&base, token.map(|t| t.secret.as_str()).unwrap_or(""))?;
        oauth_params.push(("oauth_signature".to_string(), signature));
        oauth_params.sort();

        let fields = oauth_params
            .iter()
            .map(|(name, value)| format!("{}=\"{}\"", percent_encode(name), percent_encode(value)))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!("OAuth {}", fields))
    }

    fn sign(&self, base_string: &str, token_secret: &str) -> Result<String, AppError> {
        let key = format!(
            "{}&{}",
            percent_encode(&self.consumer_secret),
            percent_encode(token_secret)
        );
        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| AppError::Upstream(format!("Failed to initialise HMAC-SHA1: {}", e)))?;
        mac.update(base_string.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

/// RFC 3986 percent-encoding (unreserved characters pass through).
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Build `METHOD&enc(base_url)&enc(sorted params)`.
pub fn signature_base_string(
    method: &str,
    url: &str,
    oauth_params: &[(String, String)],
) -> Result<String, AppError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| AppError::Upstream(format!("Invalid upstream URL {}: {}", url, e)))?;

    // Url already lowercases scheme and host and drops default ports
    let mut base_url = format!("{}://{}", parsed.scheme(), parsed.host_str().unwrap_or_default());
    if let Some(port) = parsed.port() {
        base_url.push_str(&format!(":{}", port));
    }
    base_url.push_str(parsed.path());

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (percent_encode(&k), percent_encode(&v)))
        .chain(
            oauth_params
                .iter()
                .map(|(k, v)| (percent_encode(k), percent_encode(v))),
        )
        .collect();
    params.sort();

    let param_string = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    Ok(format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(&base_url),
        percent_encode(&param_string)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference values from the OAuth Core 1.0 / RFC 5849 photo example
    const CONSUMER_KEY: &str = "dpf43f3p2l4k3l03";
    const CONSUMER_SECRET: &str = "kd94hf93k423kf44";
    const URL: &str = "http://photos.example.net/photos?file=vacation.jpg&size=original";

    fn reference_token() -> TokenPair {
        TokenPair {
            key: "nnch734d00sl2jdk".to_string(),
            secret: "pfkkdhi9sl3r4s00".to_string(),
        }
    }

    fn reference_params() -> Vec<(String, String)> {
        vec![
            ("oauth_consumer_key".to_string(), CONSUMER_KEY.to_string()),
            ("oauth_token".to_string(), "nnch734d00sl2jdk".to_string()),
            ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
            ("oauth_timestamp".to_string(), "1191242096".to_string()),
            ("oauth_nonce".to_string(), "kllo9940pd9333jh".to_string()),
            ("oauth_version".to_string(), "1.0".to_string()),
        ]
    }

    #[test]
    fn test_signature_base_string_reference() {
        let base = signature_base_string("GET", URL, &reference_params()).unwrap();
        assert_eq!(
            base,
            "GET&http%3A%2F%2Fphotos.example.net%2Fphotos&file%3Dvacation.jpg%26\
             oauth_consumer_key%3Ddpf43f3p2l4k3l03%26oauth_nonce%3Dkllo9940pd9333jh%26\
             oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1191242096%26\
             oauth_token%3Dnnch734d00sl2jdk%26oauth_version%3D1.0%26size%3Doriginal"
        );
    }

    #[test]
    fn test_signature_reference() {
        let signer = OAuth1Signer::new(Some(CONSUMER_KEY), Some(CONSUMER_SECRET)).unwrap();
        let header = signer
            .authorization_header_with(
                "GET",
                URL,
                Some(&reference_token()),
                &[],
                "kllo9940pd9333jh",
                1191242096,
            )
            .unwrap();

        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_signature=\"tR3%2BTy81lMeYAr%2FFid0kMTYa%2FWM%3D\""));
        assert!(header.contains("oauth_token=\"nnch734d00sl2jdk\""));
        // Query parameters are signed but never sent in the header
        assert!(!header.contains("file="));
    }

    #[test]
    fn test_base_url_normalization() {
        let params = vec![("oauth_nonce".to_string(), "n".to_string())];
        let base = signature_base_string("post", "HTTPS://API.Discogs.com:443/oauth/request_token", &params)
            .unwrap();
        assert!(base.starts_with("POST&https%3A%2F%2Fapi.discogs.com%2Foauth%2Frequest_token&"));

        let base = signature_base_string("GET", "http://127.0.0.1:8080/oauth/identity", &params).unwrap();
        assert!(base.starts_with("GET&http%3A%2F%2F127.0.0.1%3A8080%2Foauth%2Fidentity&"));
    }

    #[test]
    fn test_extra_params_are_signed_and_sent() {
        let signer = OAuth1Signer::new(Some("key"), Some("secret")).unwrap();
        let callback = "http://localhost:3000/api/discogs/auth/callback";
        let header = signer
            .authorization_header_with(
                "POST",
                "https://api.discogs.com/oauth/request_token",
                None,
                &[("oauth_callback", callback)],
                "nonce",
                1700000000,
            )
            .unwrap();

        assert!(header.contains(
            "oauth_callback=\"http%3A%2F%2Flocalhost%3A3000%2Fapi%2Fdiscogs%2Fauth%2Fcallback\""
        ));
        assert!(!header.contains("oauth_token="));

        // Changing the callback changes the signature
        let other = signer
            .authorization_header_with(
                "POST",
                "https://api.discogs.com/oauth/request_token",
                None,
                &[("oauth_callback", "http://evil.example/cb")],
                "nonce",
                1700000000,
            )
            .unwrap();
        let sig = |h: &str| h.split("oauth_signature=").nth(1).map(str::to_string);
        assert_ne!(sig(&header), sig(&other));
    }

    #[test]
    fn test_token_secret_affects_signature() {
        let signer = OAuth1Signer::new(Some("key"), Some("secret")).unwrap();
        let sign_with = |secret: &str| {
            let token = TokenPair {
                key: "tok".to_string(),
                secret: secret.to_string(),
            };
            signer
                .authorization_header_with("GET", "https://api.discogs.com/oauth/identity", Some(&token), &[], "n", 1)
                .unwrap()
        };
        assert_ne!(sign_with("one"), sign_with("two"));
        assert_eq!(sign_with("one"), sign_with("one"));
    }

    #[test]
    fn test_missing_consumer_credentials() {
        assert!(matches!(
            OAuth1Signer::new(None, Some("secret")),
            Err(AppError::MissingConfig(_))
        ));
        assert!(matches!(
            OAuth1Signer::new(Some("key"), Some("")),
            Err(AppError::MissingConfig(_))
        ));
        assert!(OAuth1Signer::from_config(&DiscogsConfig::default()).is_err());
    }

    #[test]
    fn test_percent_encode_unreserved_set() {
        assert_eq!(percent_encode("abc-._~XYZ09"), "abc-._~XYZ09");
        assert_eq!(percent_encode("a b&c=d/e"), "a%20b%26c%3Dd%2Fe");
        assert_eq!(percent_encode("+"), "%2B");
    }
}
