use crate::error::{TelestaffError, TelestaffResult};
use base64::{engine::general_purpose, Engine};
use log::debug;
use reqwest::header::{HeaderMap, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{RequestBuilder, Response};
use std::fmt;
use std::sync::Arc;

/// Workstation name announced during the NTLM exchange
const NTLM_WORKSTATION: &str = "TELESTAFF-CLIENT";

/// Strategy for answering HTTP authentication challenges raised in front of
/// the portal's own login form.
#[async_trait::async_trait]
pub trait Authentication: Send + Sync {
    /// Answer a `401` received for `request`.
    ///
    /// `request` is an unsent copy of the request that was challenged and
    /// `challenge` the response carrying the `401`. Returns the response to
    /// the authenticated request, or the challenge itself when the strategy
    /// has nothing to offer.
    async fn answer_challenge(
        &self,
        request: RequestBuilder,
        challenge: Response,
    ) -> TelestaffResult<Response>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Portal login form only; challenges are passed through unanswered
#[derive(Debug, Clone)]
pub struct FormAuth;

#[async_trait::async_trait]
impl Authentication for FormAuth {
    async fn answer_challenge(
        &self,
        _request: RequestBuilder,
        challenge: Response,
    ) -> TelestaffResult<Response> {
        Ok(challenge)
    }

    fn name(&self) -> &'static str {
        "form"
    }
}

/// Portal login form layered on an NTLM handshake with the domain identity
pub struct NtlmAuth {
    credentials: ntlmclient::Credentials,
}

impl NtlmAuth {
    /// `domain` and `username` are joined before splitting on `\`, so either
    /// `("CORP\\", "jdoe")` or `("", "CORP\\jdoe")` name the same account.
    pub fn new(
        domain: impl AsRef<str>,
        username: impl AsRef<str>,
        password: impl Into<String>,
    ) -> Self {
        let (domain, username) = split_identity(domain.as_ref(), username.as_ref());
        Self {
            credentials: ntlmclient::Credentials {
                username,
                password: password.into(),
                domain,
            },
        }
    }

    fn negotiate_header(&self) -> TelestaffResult<String> {
        let flags = ntlmclient::Flags::NEGOTIATE_UNICODE
            | ntlmclient::Flags::REQUEST_TARGET
            | ntlmclient::Flags::NEGOTIATE_NTLM
            | ntlmclient::Flags::NEGOTIATE_WORKSTATION_SUPPLIED;
        let message = ntlmclient::Message::Negotiate(ntlmclient::NegotiateMessage {
            flags,
            supplied_domain: String::new(),
            supplied_workstation: NTLM_WORKSTATION.to_owned(),
            os_version: Default::default(),
        });
        let bytes = message.to_bytes().map_err(|e| {
            TelestaffError::auth_error(None, format!("Failed to encode NTLM negotiation: {:?}", e))
        })?;
        Ok(format!("NTLM {}", general_purpose::STANDARD.encode(bytes)))
    }

    fn authenticate_header(&self, challenge_token: &str) -> TelestaffResult<String> {
        let challenge_bytes = general_purpose::STANDARD
            .decode(challenge_token)
            .map_err(|e| TelestaffError::auth_error(None, format!("Invalid NTLM challenge: {}", e)))?;
        let message = ntlmclient::Message::try_from(challenge_bytes.as_slice()).map_err(|e| {
            TelestaffError::auth_error(None, format!("Undecodable NTLM challenge: {:?}", e))
        })?;
        let challenge = match message {
            ntlmclient::Message::Challenge(c) => c,
            other => {
                return Err(TelestaffError::auth_error(
                    None,
                    format!("Expected NTLM challenge, got {:?}", other),
                ))
            }
        };
        let target_info: Vec<u8> = challenge
            .target_information
            .iter()
            .flat_map(|entry| entry.to_bytes())
            .collect();

        let response = ntlmclient::respond_challenge_ntlm_v2(
            challenge.challenge,
            &target_info,
            ntlmclient::get_ntlm_time(),
            &self.credentials,
        );
        let flags = ntlmclient::Flags::NEGOTIATE_UNICODE | ntlmclient::Flags::NEGOTIATE_NTLM;
        let message = response.to_message(&self.credentials, NTLM_WORKSTATION, flags);
        let bytes = message.to_bytes().map_err(|e| {
            TelestaffError::auth_error(None, format!("Failed to encode NTLM response: {:?}", e))
        })?;
        Ok(format!("NTLM {}", general_purpose::STANDARD.encode(bytes)))
    }
}

impl fmt::Debug for NtlmAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NtlmAuth")
            .field("domain", &self.credentials.domain)
            .field("username", &self.credentials.username)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Authentication for NtlmAuth {
    async fn answer_challenge(
        &self,
        request: RequestBuilder,
        challenge: Response,
    ) -> TelestaffResult<Response> {
        if ntlm_token(challenge.headers()).is_none() {
            debug!("Challenge does not offer NTLM, passing it through");
            return Ok(challenge);
        }

        // The handshake is bound to one connection; the same request is sent twice.
        let final_request = request.try_clone().ok_or_else(|| {
            TelestaffError::invalid_param("request body cannot be replayed for NTLM")
        })?;

        debug!("Sending NTLM negotiation as {}\\{}", self.credentials.domain, self.credentials.username);
        let response = request
            .header(AUTHORIZATION, self.negotiate_header()?)
            .send()
            .await?;

        let token = match ntlm_token(response.headers()) {
            Some(token) if !token.is_empty() => token,
            _ => {
                return Err(TelestaffError::auth_error(
                    Some(response.status().as_u16()),
                    "Proxy did not answer the NTLM negotiation with a challenge",
                ))
            }
        };

        let authorization = self.authenticate_header(&token)?;
        let response = final_request
            .header(AUTHORIZATION, authorization)
            .send()
            .await?;
        debug!("NTLM handshake finished with HTTP {}", response.status());
        Ok(response)
    }

    fn name(&self) -> &'static str {
        "ntlm"
    }
}

/// Token of the NTLM entry in `WWW-Authenticate`; empty for a bare offer
fn ntlm_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| {
            let mut parts = value.trim().splitn(2, ' ');
            let scheme = parts.next()?;
            scheme
                .eq_ignore_ascii_case("NTLM")
                .then(|| parts.next().unwrap_or("").trim().to_string())
        })
}

/// Join domain and user, then split on the first `\` into (domain, user)
fn split_identity(domain: &str, username: &str) -> (String, String) {
    let joined = format!("{}{}", domain, username);
    match joined.split_once('\\') {
        Some((domain, user)) => (domain.to_string(), user.to_string()),
        None => (String::new(), joined),
    }
}

/// Login identity for the portal and, optionally, the NTLM proxy in front of it
#[derive(Clone)]
pub struct Credentials {
    pub host: String,
    pub username: String,
    pub password: String,
    pub domain: String,
    pub domain_user: Option<String>,
    pub domain_pass: Option<String>,
}

impl Credentials {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            domain: domain.into(),
            domain_user: None,
            domain_pass: None,
        }
    }

    /// Add the downstream (NTLM) account
    pub fn with_domain_login(
        mut self,
        domain_user: impl Into<String>,
        domain_pass: impl Into<String>,
    ) -> Self {
        self.domain_user = Some(domain_user.into());
        self.domain_pass = Some(domain_pass.into());
        self
    }

    /// Domain and downstream user joined the way the proxy expects them
    pub fn domain_identity(&self) -> Option<String> {
        self.domain_user
            .as_ref()
            .map(|user| format!("{}{}", self.domain, user))
    }

    /// NTLM when a downstream account is configured, the plain form otherwise
    pub fn authentication(&self) -> Arc<dyn Authentication> {
        match (&self.domain_user, &self.domain_pass) {
            (Some(user), Some(pass)) => Arc::new(NtlmAuth::new(&self.domain, user, pass.clone())),
            _ => Arc::new(FormAuth),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("domain", &self.domain)
            .field("domain_user", &self.domain_user)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn identity_splits_on_backslash() {
        assert_eq!(
            split_identity("CORP\\", "jdoe"),
            ("CORP".to_string(), "jdoe".to_string())
        );
        assert_eq!(
            split_identity("", "CORP\\jdoe"),
            ("CORP".to_string(), "jdoe".to_string())
        );
        assert_eq!(split_identity("", "jdoe"), (String::new(), "jdoe".to_string()));
    }

    #[test]
    fn strategy_follows_downstream_credentials() {
        let plain = Credentials::new("https://ts.example.org", "user", "pass", "CORP\\");
        assert_eq!(plain.authentication().name(), "form");
        assert_eq!(plain.domain_identity(), None);

        let proxied = plain.with_domain_login("jdoe", "secret");
        assert_eq!(proxied.authentication().name(), "ntlm");
        assert_eq!(proxied.domain_identity().as_deref(), Some("CORP\\jdoe"));
    }

    #[test]
    fn debug_output_hides_passwords() {
        let creds = Credentials::new("https://ts.example.org", "user", "hunter2", "CORP\\")
            .with_domain_login("jdoe", "swordfish");
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("swordfish"));
    }

    #[test]
    fn ntlm_token_is_read_from_challenge_header() {
        let mut headers = HeaderMap::new();
        headers.append(WWW_AUTHENTICATE, HeaderValue::from_static("Negotiate"));
        headers.append(WWW_AUTHENTICATE, HeaderValue::from_static("NTLM TlRMTVNTUAACAAAA"));
        assert_eq!(ntlm_token(&headers).as_deref(), Some("TlRMTVNTUAACAAAA"));

        let mut bare = HeaderMap::new();
        bare.insert(WWW_AUTHENTICATE, HeaderValue::from_static("NTLM"));
        assert_eq!(ntlm_token(&bare).as_deref(), Some(""));

        assert_eq!(ntlm_token(&HeaderMap::new()), None);
    }
}
