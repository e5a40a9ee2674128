use crate::{
    auth::{Authentication, Credentials},
    config::ClientConfig,
    error::{excerpt, TelestaffError, TelestaffResult},
    parser,
    resource::{date_or_today, PortalUrl, Resource},
};
use log::{debug, info, warn};
use reqwest::header::{ACCEPT, REFERER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::sync::Arc;
use url::Url;

const JSON_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";

/// One authenticated, cookie-bearing conversation with the portal
pub struct Session {
    config: ClientConfig,
    portal: PortalUrl,
    credentials: Credentials,
    auth: Arc<dyn Authentication>,
    http: Client,
    authenticated: bool,
}

impl Session {
    /// Prepare a session; nothing is sent until the first login
    pub fn new(config: ClientConfig, credentials: Credentials) -> TelestaffResult<Self> {
        let portal = PortalUrl::parse(&credentials.host)?;
        let http = config.build_http()?;
        let auth = credentials.authentication();

        Ok(Self {
            config,
            portal,
            credentials,
            auth,
            http,
            authenticated: false,
        })
    }

    pub fn portal(&self) -> &PortalUrl {
        &self.portal
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Log in unless the current session is still good
    pub async fn ensure_session(&mut self) -> TelestaffResult<()> {
        if self.authenticated {
            debug!("Reusing portal session");
            return Ok(());
        }
        self.authenticate().await
    }

    /// Log in from scratch. A failed login leaves the session cleared.
    pub async fn authenticate(&mut self) -> TelestaffResult<()> {
        match self.login().await {
            Ok(()) => {
                self.authenticated = true;
                Ok(())
            }
            Err(err) => {
                if let Err(reset) = self.invalidate() {
                    warn!("Could not reset session after failed login: {}", reset);
                }
                Err(err)
            }
        }
    }

    /// Drop cookies and tokens; the next request logs in again
    pub fn invalidate(&mut self) -> TelestaffResult<()> {
        debug!("Discarding portal session");
        self.http = self.config.build_http()?;
        self.authenticated = false;
        Ok(())
    }

    async fn login(&mut self) -> TelestaffResult<()> {
        info!(
            "Logging in to {} as {} ({} authentication)",
            self.portal.root(),
            self.credentials.username,
            self.auth.name()
        );
        if let Some(identity) = self.credentials.domain_identity() {
            debug!("Domain identity: {}", identity);
        }

        let login_page = self.url(Resource::LoginPage)?;
        debug!("HTTP GET {}", login_page);
        let page = self.send(self.http.get(login_page)).await?;
        let status = page.status();
        let body = page.text().await?;
        if status != StatusCode::OK {
            return Err(TelestaffError::auth_error(
                Some(status.as_u16()),
                format!("Login page returned HTTP {}: {}", status, excerpt(&body)),
            ));
        }

        let token = parser::csrf_token(&body)?
            .ok_or_else(|| TelestaffError::layout("Login page has no CSRFToken", &body))?;
        let form = [
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
            ("CSRFToken", token.as_str()),
        ];

        let submit = self.url(Resource::Login)?;
        debug!("HTTP POST {}", submit);
        let mut response = self.send(self.http.post(submit).form(&form)).await?;

        // Unread contact log messages block the session until dispositioned
        if response.url().path().ends_with("/checkContactLog") {
            info!("Acknowledging pending contact log messages");
            self.send(self.http.get(self.url(Resource::ContactLog)?)).await?;
            response = self
                .send(self.http.get(self.url(Resource::DispoContactLog)?))
                .await?;
        }

        let status = response.status();
        let landed = response.url().clone();
        let body = response.text().await?;
        debug!("Login finished with HTTP {} at {}", status, landed);

        if status != StatusCode::OK {
            return Err(TelestaffError::auth_error(
                Some(status.as_u16()),
                format!("Login returned HTTP {}: {}", status, excerpt(&body)),
            ));
        }
        if is_login_url(&landed) || parser::is_login_form(&body) {
            return Err(TelestaffError::auth_error(
                Some(status.as_u16()),
                "Portal rejected the username and password",
            ));
        }

        info!("Logged in to {}", self.portal.root());
        Ok(())
    }

    /// GET a page through the session.
    ///
    /// `json` asks for the portal's AJAX/JSON rendering; `referer` is sent for
    /// endpoints that check where the request came from.
    pub async fn get_page(
        &mut self,
        url: Url,
        json: bool,
        referer: Option<&Url>,
    ) -> TelestaffResult<String> {
        debug!("HTTP GET {} (json={})", url, json);
        let request = self.http.get(url);
        let request = decorate(request, json, referer);
        self.read_page(request).await
    }

    /// POST a form through the session
    pub async fn post_form(
        &mut self,
        url: Url,
        form: &[(&str, &str)],
        referer: Option<&Url>,
    ) -> TelestaffResult<String> {
        debug!("HTTP POST {}", url);
        let request = self.http.post(url).form(form);
        let request = decorate(request, false, referer);
        self.read_page(request).await
    }

    async fn read_page(&mut self, request: RequestBuilder) -> TelestaffResult<String> {
        let response = self.send(request).await?;
        let status = response.status();
        let landed = response.url().clone();
        debug!("HTTP {} from {}", status, landed);

        if is_login_url(&landed) {
            self.invalidate()?;
            return Err(TelestaffError::SessionExpired {
                url: landed.to_string(),
            });
        }

        let body = response.text().await?;
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                self.invalidate()?;
                return Err(TelestaffError::auth_error(
                    Some(status.as_u16()),
                    format!("Access denied to {}: {}", landed, excerpt(&body)),
                ))
            }
            s if !s.is_success() => return Err(TelestaffError::api_error(s.as_u16(), &body)),
            _ => {}
        }

        if parser::is_login_form(&body) {
            self.invalidate()?;
            return Err(TelestaffError::SessionExpired {
                url: landed.to_string(),
            });
        }

        Ok(body)
    }

    /// Send a request, answering a `401` with the configured strategy
    async fn send(&self, request: RequestBuilder) -> TelestaffResult<Response> {
        let replay = request.try_clone();
        let response = request.send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        match replay {
            Some(replay) => {
                debug!(
                    "HTTP 401 from {}, answering with {} authentication",
                    response.url(),
                    self.auth.name()
                );
                self.auth.answer_challenge(replay, response).await
            }
            None => Ok(response),
        }
    }

    fn url(&self, resource: Resource) -> TelestaffResult<Url> {
        self.portal.resource(resource, date_or_today(None))
    }
}

fn decorate(request: RequestBuilder, json: bool, referer: Option<&Url>) -> RequestBuilder {
    let mut request = request;
    if json {
        request = request
            .header(ACCEPT, JSON_ACCEPT)
            .header("X-Requested-With", "XMLHttpRequest");
    }
    if let Some(referer) = referer {
        request = request.header(REFERER, referer.as_str());
    }
    request
}

/// The portal bounces unauthenticated requests to `/login`
fn is_login_url(url: &Url) -> bool {
    url.path().trim_end_matches('/').ends_with("/login")
}
