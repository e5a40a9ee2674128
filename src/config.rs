//! Client configuration options.

use std::time::Duration;

/// Browser user agent; the portal serves a degraded page to unknown agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_12_5) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/59.0.3071.115 Safari/537.36";

/// Configuration for the Telestaff client.
///
/// # Example
///
/// ```
/// use telestaff_client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(60))
///     .with_verify_ssl_cert(false);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Per-request timeout
    pub timeout: Duration,
    /// User-Agent header value
    pub user_agent: String,
    /// Whether to verify the portal's TLS certificate
    pub verify_ssl_cert: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            verify_ssl_cert: true,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Enable or disable TLS certificate verification.
    pub fn with_verify_ssl_cert(mut self, verify: bool) -> Self {
        self.verify_ssl_cert = verify;
        self
    }

    /// Build the cookie-bearing HTTP client described by this configuration.
    pub(crate) fn build_http(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.timeout)
            .cookie_store(true)
            .danger_accept_invalid_certs(!self.verify_ssl_cert)
            .build()
    }
}
