//! Report kinds and the portal endpoints they map to.

use crate::error::{TelestaffError, TelestaffResult};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Kind of report requested from the portal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum ReportKind {
    Dashboard,
    Roster,
    RosterFull,
    Calendar,
    Picklist,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Dashboard => "dashboard",
            ReportKind::Roster => "roster",
            ReportKind::RosterFull => "rosterFull",
            ReportKind::Calendar => "calendar",
            ReportKind::Picklist => "picklist",
        }
    }

    /// Page holding this report's data
    pub fn resource(&self) -> Resource {
        match self {
            ReportKind::Dashboard => Resource::Dashboard,
            ReportKind::Roster => Resource::Roster,
            ReportKind::RosterFull => Resource::RosterFull,
            ReportKind::Calendar => Resource::Calendar,
            ReportKind::Picklist => Resource::PickListData,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = TelestaffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dashboard" => Ok(ReportKind::Dashboard),
            "roster" => Ok(ReportKind::Roster),
            "rosterFull" => Ok(ReportKind::RosterFull),
            "calendar" => Ok(ReportKind::Calendar),
            "picklist" => Ok(ReportKind::Picklist),
            other => Err(TelestaffError::UnknownKind(other.to_string())),
        }
    }
}

/// Portal endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    LoginPage,
    Login,
    ContactLog,
    DispoContactLog,
    PickList,
    CustomPickList,
    PickListData,
    Roster,
    RosterFull,
    Calendar,
    Dashboard,
}

impl Resource {
    /// Path below the portal root; `date` is already formatted as `YYYYMMDD`
    pub fn path(&self, date: &str) -> String {
        match self {
            Resource::LoginPage => "/login".to_string(),
            Resource::Login => "/processWebLogin".to_string(),
            Resource::ContactLog => "/contactLog?myContactLog=true".to_string(),
            Resource::DispoContactLog => {
                "/contactLog?dispositionedUnrespondedLogs=true".to_string()
            }
            Resource::PickList => format!(
                "/schedule/pickList/fromCalendar/{date}/675?returnUrl=%2Fcalendar%2F{date}%2F675"
            ),
            Resource::CustomPickList => "/schedule/pickList/setPickListProperty".to_string(),
            Resource::PickListData => "/schedule/pickList/tableAjaxData".to_string(),
            Resource::Roster => format!("/roster/d%5B{date}%5D/"),
            Resource::RosterFull => format!("/roster/d%5B{date}%5D?rosterViewId=-1_3"),
            Resource::Calendar => format!("/calendar/{date}/list/"),
            Resource::Dashboard => "/calendar/dashboard".to_string(),
        }
    }
}

/// Date format used in portal paths
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// The given date, or today in local time
pub fn date_or_today(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Local::now().date_naive())
}

/// Portal root URL. Paths are appended verbatim so that a host mounted below
/// a prefix (`https://portal/webstaff`) keeps its prefix.
#[derive(Debug, Clone)]
pub struct PortalUrl {
    root: String,
}

impl PortalUrl {
    pub fn parse(host: &str) -> TelestaffResult<Self> {
        let parsed = Url::parse(host)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TelestaffError::invalid_param(format!(
                "unsupported scheme for portal host: {}",
                parsed.scheme()
            )));
        }
        Ok(Self {
            root: host.trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Absolute URL of a resource on the given date
    pub fn resource(&self, resource: Resource, date: NaiveDate) -> TelestaffResult<Url> {
        let path = resource.path(&format_date(date));
        Ok(Url::parse(&format!("{}{}", self.root, path))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn kinds_round_trip_through_their_names() {
        for kind in [
            ReportKind::Dashboard,
            ReportKind::Roster,
            ReportKind::RosterFull,
            ReportKind::Calendar,
            ReportKind::Picklist,
        ] {
            assert_eq!(kind.as_str().parse::<ReportKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = "overtime".parse::<ReportKind>().unwrap_err();
        assert!(matches!(err, TelestaffError::UnknownKind(k) if k == "overtime"));
    }

    #[test]
    fn roster_url_encodes_date_brackets() {
        let portal = PortalUrl::parse("https://telestaff.example.org/").unwrap();
        let url = portal.resource(Resource::Roster, date()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://telestaff.example.org/roster/d%5B20240309%5D/"
        );
    }

    #[test]
    fn host_prefix_is_kept() {
        let portal = PortalUrl::parse("https://example.org/webstaff").unwrap();
        let url = portal.resource(ReportKind::Calendar.resource(), date()).unwrap();
        assert_eq!(url.as_str(), "https://example.org/webstaff/calendar/20240309/list/");
    }

    #[test]
    fn picklist_page_carries_return_url() {
        let path = Resource::PickList.path("20240309");
        assert_eq!(
            path,
            "/schedule/pickList/fromCalendar/20240309/675?returnUrl=%2Fcalendar%2F20240309%2F675"
        );
    }

    #[test]
    fn non_http_host_is_rejected() {
        assert!(matches!(
            PortalUrl::parse("ftp://example.org"),
            Err(TelestaffError::InvalidParameter(_))
        ));
        assert!(matches!(PortalUrl::parse("not a url"), Err(TelestaffError::Url(_))));
    }
}
