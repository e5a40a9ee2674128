use crate::{error::TelestaffResult, resource::ReportKind};
use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Result of a `fetch`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "type")]
    pub kind: ReportKind,
    pub date: NaiveDate,
    pub data: serde_json::Value,
}

impl Report {
    /// Serialize the whole report as JSON text
    pub fn to_json(&self) -> TelestaffResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Roster groups keyed by level (`Date`, `Shift`, `Unit`, `Position`, ...),
/// in the order the levels first appear on the page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupMap(Vec<(String, Vec<RosterGroup>)>);

impl GroupMap {
    pub fn push(&mut self, level: &str, group: RosterGroup) {
        match self.0.iter_mut().find(|(name, _)| name == level) {
            Some((_, groups)) => groups.push(group),
            None => self.0.push((level.to_string(), vec![group])),
        }
    }

    pub fn get(&self, level: &str) -> Option<&[RosterGroup]> {
        self.0
            .iter()
            .find(|(name, _)| name == level)
            .map(|(_, groups)| groups.as_slice())
    }

    pub fn levels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for GroupMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (level, groups) in &self.0 {
            map.serialize_entry(level, groups)?;
        }
        map.end()
    }
}

/// A parsed roster page
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Roster {
    #[serde(flatten)]
    pub groups: GroupMap,
}

/// One level of the roster tree (institution, shift, unit, position, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterGroup {
    pub title: String,
    pub notes: String,
    pub is_suppressed: bool,
    #[serde(flatten)]
    pub member: Option<Member>,
    #[serde(flatten)]
    pub children: GroupMap,
}

/// Staff member assigned to a position
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    pub specialties: String,
    pub badge: String,
    pub workcode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workcode_style: Option<String>,
    pub exception_code: String,
    pub is_request: bool,
    pub start_time: String,
    pub end_time: String,
    pub duration: String,
    pub is_working: bool,
    pub is_assigned: bool,
    pub is_vacant: bool,
}

impl Default for Member {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            specialties: String::new(),
            badge: String::new(),
            workcode: String::new(),
            workcode_style: None,
            exception_code: String::new(),
            is_request: false,
            start_time: String::new(),
            end_time: String::new(),
            duration: "24".to_string(),
            is_working: true,
            is_assigned: true,
            is_vacant: false,
        }
    }
}

/// Member calendar list view
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Calendar {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    pub days: Vec<CalendarDay>,
}

/// Landing page calendar
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dashboard {
    pub daterange: String,
    pub days: Vec<CalendarDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarDay {
    /// `YYYYMMDD`
    pub date: String,
    pub events: Vec<CalendarEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub is_request: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_style: Option<String>,
}

impl Default for CalendarEvent {
    fn default() -> Self {
        Self {
            kind: "unknown".to_string(),
            is_request: false,
            name: None,
            location: None,
            time: None,
            length: None,
            exception_code: None,
            icon_style: None,
        }
    }
}

/// Hidden fields of the picklist page needed to switch strategy chains
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PicklistForm {
    pub date: String,
    #[serde(rename = "regionTbl")]
    pub region: String,
    #[serde(rename = "shiftTbl")]
    pub shift: String,
    #[serde(rename = "CSRFToken")]
    pub csrf_token: String,
}

impl PicklistForm {
    /// Form body selecting `chain`
    pub fn with_chain<'a>(&'a self, chain: &'a str) -> [(&'static str, &'a str); 5] {
        [
            ("date", self.date.as_str()),
            ("regionTbl", self.region.as_str()),
            ("shiftTbl", self.shift.as_str()),
            ("strategyChainTbl", chain),
            ("CSRFToken", self.csrf_token.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn group_map_keeps_first_seen_level_order() {
        let mut map = GroupMap::default();
        map.push("Shift", RosterGroup::default());
        map.push("Date", RosterGroup::default());
        map.push("Shift", RosterGroup::default());

        assert_eq!(map.levels().collect::<Vec<_>>(), vec!["Shift", "Date"]);
        assert_eq!(map.get("Shift").map(|g| g.len()), Some(2));
        assert!(map.get("Unit").is_none());
    }

    #[test]
    fn position_serializes_member_fields_inline() {
        let group = RosterGroup {
            title: "Firefighter".into(),
            member: Some(Member {
                id: "42".into(),
                name: "Doe, Jane".into(),
                ..Member::default()
            }),
            ..RosterGroup::default()
        };
        let value = serde_json::to_value(&group).unwrap();
        assert_eq!(value["title"], json!("Firefighter"));
        assert_eq!(value["name"], json!("Doe, Jane"));
        assert_eq!(value["duration"], json!("24"));
        assert_eq!(value["isWorking"], json!(true));
        assert!(value.get("workcodeStyle").is_none());
    }

    #[test]
    fn report_serializes_kind_as_type() {
        let report = Report {
            kind: ReportKind::RosterFull,
            date: NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
            data: json!({"entries": []}),
        };
        let text = report.to_json().unwrap();
        assert_eq!(
            text,
            r#"{"type":"rosterFull","date":"2024-03-11","data":{"entries":[]}}"#
        );
    }
}
