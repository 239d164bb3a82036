//! Engine configuration (spec §9 "Configuration"): a single recognized
//! options struct, built with `typed-builder` in the teacher's style
//! (see `TokenValidator` in the teacher crate's `token.rs`).

use std::time::Duration;

use typed_builder::TypedBuilder;

#[derive(Debug, Clone, TypedBuilder)]
pub struct BackChannelAuthOptions {
    #[builder(default = Duration::from_secs(5))]
    pub poll_interval: Duration,
    #[builder(default = Duration::from_secs(5))]
    pub max_long_poll: Duration,
    #[builder(default = false)]
    pub use_long_polling: bool,
    #[builder(default = Duration::from_secs(10))]
    pub notification_timeout: Duration,
    #[builder(default = Duration::from_secs(90))]
    pub http_handler_lifetime: Duration,
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct SecureHttpFetchOptions {
    #[builder(default = vec!["https".to_owned()])]
    pub allowed_schemes: Vec<String>,
    #[builder(default = true)]
    pub block_private_networks: bool,
    #[builder(default = Duration::from_secs(30))]
    pub request_timeout: Duration,
    #[builder(default = 5 * 1024 * 1024)]
    pub max_response_bytes: u64,
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct Options {
    #[builder(setter(into))]
    pub issuer: String,
    #[builder(default = Duration::from_secs(3600))]
    pub access_token_ttl: Duration,
    #[builder(default = Duration::from_secs(30 * 24 * 3600))]
    pub refresh_token_ttl: Duration,
    #[builder(default = Duration::from_secs(600))]
    pub authorization_code_ttl: Duration,
    #[builder(default = Duration::from_secs(30))]
    pub clock_skew: Duration,
    #[builder(default = Duration::from_secs(5 * 60))]
    pub jwks_cache_ttl: Duration,
    #[builder(default)]
    pub back_channel_auth: BackChannelAuthOptions,
    #[builder(default)]
    pub secure_http_fetch: SecureHttpFetchOptions,
}

impl Default for BackChannelAuthOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Default for SecureHttpFetchOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}
