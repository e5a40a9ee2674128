use crate::{
    auth::Credentials,
    config::ClientConfig,
    error::{TelestaffError, TelestaffResult},
    models::Report,
    parser,
    resource::{date_or_today, format_date, ReportKind, Resource},
    session::Session,
};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde_json::Value;
use url::Url;

/// Main Telestaff client
///
/// Owns exactly one portal session. Requests take `&mut self`, so a client
/// is used by one caller at a time; give each task its own client.
pub struct TelestaffClient {
    session: Session,
}

impl TelestaffClient {
    /// Create a client for `host`.
    ///
    /// `d_user`/`d_pass` name the domain account for an NTLM proxy in front
    /// of the portal; leave both out when the portal is reached directly.
    /// Giving only one of them is an `InvalidParameter` error.
    /// No request is made until the first fetch.
    pub fn new(
        host: impl Into<String>,
        t_user: impl Into<String>,
        t_pass: impl Into<String>,
        domain: impl Into<String>,
        d_user: Option<String>,
        d_pass: Option<String>,
    ) -> TelestaffResult<Self> {
        let credentials = Credentials::new(host, t_user, t_pass, domain);
        let credentials = match (d_user, d_pass) {
            (Some(user), Some(pass)) => credentials.with_domain_login(user, pass),
            (None, None) => credentials,
            _ => {
                return Err(TelestaffError::invalid_param(
                    "domain account needs both a user and a password",
                ))
            }
        };
        Self::with_config(ClientConfig::default(), credentials)
    }

    /// Create a client with custom timeout, TLS or user agent settings
    pub fn with_config(config: ClientConfig, credentials: Credentials) -> TelestaffResult<Self> {
        Ok(Self {
            session: Session::new(config, credentials)?,
        })
    }

    /// Portal root all requests go to
    pub fn host(&self) -> &str {
        self.session.portal().root()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Log in now instead of on the first fetch
    pub async fn authenticate(&mut self) -> TelestaffResult<()> {
        self.session.authenticate().await
    }

    /// Fetch a report.
    ///
    /// # Arguments
    /// * `kind` - Report to fetch
    /// * `date` - Day of the report, today when `None`
    /// * `json_export` - Ask the portal for JSON instead of scraping HTML
    ///
    /// A session the portal rejects mid-flight is re-established once and the
    /// request repeated; any other failure is returned as-is.
    pub async fn fetch(
        &mut self,
        kind: ReportKind,
        date: Option<NaiveDate>,
        json_export: bool,
    ) -> TelestaffResult<Report> {
        if kind == ReportKind::Picklist {
            return self.fetch_picklist(date, None).await;
        }

        let date = date_or_today(date);
        info!("Fetching {} for {}", kind, format_date(date));
        let url = self.session.portal().resource(kind.resource(), date)?;

        let data = match self.fetch_once(kind, &url, json_export).await {
            Err(TelestaffError::SessionExpired { url: bounced }) => {
                warn!("Portal session rejected at {}, logging in again", bounced);
                self.fetch_once(kind, &url, json_export)
                    .await
                    .map_err(after_retry)?
            }
            other => other?,
        };

        Ok(Report { kind, date, data })
    }

    /// Fetch the roster for a day
    pub async fn roster(&mut self, date: Option<NaiveDate>) -> TelestaffResult<Report> {
        self.fetch(ReportKind::Roster, date, false).await
    }

    /// Fetch the member calendar list starting at a day
    pub async fn calendar(&mut self, date: Option<NaiveDate>) -> TelestaffResult<Report> {
        self.fetch(ReportKind::Calendar, date, false).await
    }

    /// Fetch the dashboard calendar
    pub async fn dashboard(&mut self) -> TelestaffResult<Report> {
        self.fetch(ReportKind::Dashboard, None, false).await
    }

    /// Fetch the picklist for a day.
    ///
    /// # Arguments
    /// * `date` - Day of the picklist, today when `None`
    /// * `chain` - Strategy chain to select instead of the default one
    pub async fn fetch_picklist(
        &mut self,
        date: Option<NaiveDate>,
        chain: Option<&str>,
    ) -> TelestaffResult<Report> {
        let date = date_or_today(date);
        info!("Fetching picklist for {}", format_date(date));

        let data = match self.picklist_once(date, chain).await {
            Err(TelestaffError::SessionExpired { url: bounced }) => {
                warn!("Portal session rejected at {}, logging in again", bounced);
                self.picklist_once(date, chain).await.map_err(after_retry)?
            }
            other => other?,
        };

        Ok(Report {
            kind: ReportKind::Picklist,
            date,
            data,
        })
    }

    async fn fetch_once(
        &mut self,
        kind: ReportKind,
        url: &Url,
        json_export: bool,
    ) -> TelestaffResult<Value> {
        self.session.ensure_session().await?;
        let body = self.session.get_page(url.clone(), json_export, None).await?;
        parser::parse(kind, &body, json_export)
    }

    async fn picklist_once(&mut self, date: NaiveDate, chain: Option<&str>) -> TelestaffResult<Value> {
        self.session.ensure_session().await?;
        let portal = self.session.portal().clone();

        let page_url = portal.resource(Resource::PickList, date)?;
        let page = self.session.get_page(page_url.clone(), true, None).await?;

        if let Some(chain) = chain {
            let form = parser::picklist_form(&page)?;
            debug!("Selecting picklist chain {} in region {}", chain, form.region);
            let target = portal.resource(Resource::CustomPickList, date)?;
            self.session
                .post_form(target, &form.with_chain(chain), Some(&page_url))
                .await?;
        }

        let data_url = portal.resource(Resource::PickListData, date)?;
        let body = self.session.get_page(data_url, true, Some(&page_url)).await?;
        parser::parse_json(&body)
    }
}

/// A session rejected right after a fresh login means the login itself is
/// not being honored.
fn after_retry(err: TelestaffError) -> TelestaffError {
    match err {
        TelestaffError::SessionExpired { url } => TelestaffError::auth_error(
            None,
            format!("Portal rejected a freshly established session (sent to {})", url),
        ),
        other => other,
    }
}
