use super::{clean_string, clean_text_of, element_text, selector};
use crate::{
    error::{TelestaffError, TelestaffResult},
    models::{Calendar, CalendarDay, CalendarEvent, Dashboard},
};
use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::OnceLock;

/// `(owner) start - end` in the calendar list header
fn header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\(([^)]*)\)?\s?(\S*)\D*([^a-zA-Z]*)").expect("header pattern is valid")
    })
}

/// Parse the calendar list view
pub fn parse_calendar(body: &str) -> TelestaffResult<Calendar> {
    let document = Html::parse_document(body);
    let root = document.root_element();
    let mut calendar = Calendar::default();

    let header = clean_text_of(root, "div.listHeader")?;
    let day_sel = selector("div.calendarDay")?;
    if header.is_none() && root.select(&day_sel).next().is_none() {
        return Err(TelestaffError::layout("No calendar found", body));
    }

    if let Some(caps) = header.as_deref().and_then(|h| header_pattern().captures(h)) {
        let group = |i: usize| {
            caps.get(i)
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty())
        };
        calendar.owner = group(1);
        calendar.start = group(2);
        calendar.end = group(3);
    }

    // Days of the list view live in the main content column; sidebar widgets
    // repeat some of them
    let content_sel = selector("div.fullWidth, div.topMarginSmall")?;
    let content = root.select(&content_sel).next().unwrap_or(root);
    calendar.days = parse_days(content, body)?;
    Ok(calendar)
}

/// Parse the dashboard landing page
pub fn parse_dashboard(body: &str) -> TelestaffResult<Dashboard> {
    let document = Html::parse_document(body);
    let root = document.root_element();

    let range_sel = selector("span.dateRange")?;
    let range = root
        .select(&range_sel)
        .next()
        .ok_or_else(|| TelestaffError::layout("No dashboard date range found", body))?;

    Ok(Dashboard {
        daterange: element_text(range).trim().to_string(),
        days: parse_days(root, body)?,
    })
}

fn parse_days(root: ElementRef<'_>, body: &str) -> TelestaffResult<Vec<CalendarDay>> {
    let day_sel = selector("div.calendarDay")?;
    let date_sel = selector("div.dateDiv")?;
    let event_sel = selector("div.listItem")?;

    let mut days = Vec::new();
    for day in root.select(&day_sel) {
        let date_text = day
            .select(&date_sel)
            .next()
            .map(|el| element_text(el).trim().to_string())
            .ok_or_else(|| TelestaffError::layout("Calendar day without a date", body))?;
        let date = NaiveDate::parse_from_str(&date_text, "%A, %B %d, %Y").map_err(|e| {
            TelestaffError::layout(format!("Unreadable calendar date {:?}: {}", date_text, e), body)
        })?;

        let events = day
            .select(&event_sel)
            .map(parse_event)
            .collect::<TelestaffResult<Vec<_>>>()?;

        days.push(CalendarDay {
            date: date.format("%Y%m%d").to_string(),
            events,
        });
    }
    Ok(days)
}

fn parse_event(item: ElementRef<'_>) -> TelestaffResult<CalendarEvent> {
    let mut event = CalendarEvent {
        name: clean_text_of(item, "div.listItemName")?,
        location: clean_text_of(item, "div.listItemWhere")?,
        time: clean_text_of(item, "div.listItemStartTime")?,
        length: clean_text_of(item, "div.listItemHours")?,
        exception_code: clean_text_of(item, "div.exception")?,
        ..CalendarEvent::default()
    };

    let asterisk = selector("span.glyphicon-asterisk")?;
    event.is_request = item.select(&asterisk).next().is_some();

    if let Some(kind) = item.value().attr("data-attrtype") {
        event.kind = kind.to_string();
    }

    let icon = selector("div.listItemBox > div")?;
    event.icon_style = item
        .select(&icon)
        .next()
        .and_then(|el| el.value().attr("style"))
        .map(clean_string);

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAYS: &str = r#"
<div class="calendarDay">
  <div class="dateDiv"> Monday, March 11, 2024 </div>
  <div class="listItem" data-attrtype="work">
    <div class="listItemBox"><div style="background-color:
      #123456;"></div></div>
    <div class="listItemName">Engine 1</div>
    <div class="listItemWhere">Station 1</div>
    <div class="listItemStartTime">07:00 - 07:00</div>
    <div class="listItemHours">24.00</div>
  </div>
  <div class="listItem">
    <span class="glyphicon glyphicon-asterisk"></span>
    <div class="listItemName">Vacation</div>
    <div class="exception">VAC</div>
  </div>
</div>
<div class="calendarDay">
  <div class="dateDiv">Tuesday, March 12, 2024</div>
</div>
"#;

    #[test]
    fn dashboard_lists_days_and_events() {
        let html = format!(
            r#"<html><body><span class="dateRange"> Mar 11 - Mar 17 </span>{}</body></html>"#,
            DAYS
        );
        let dashboard = parse_dashboard(&html).unwrap();
        assert_eq!(dashboard.daterange, "Mar 11 - Mar 17");
        assert_eq!(dashboard.days.len(), 2);
        assert_eq!(dashboard.days[0].date, "20240311");
        assert_eq!(dashboard.days[1].date, "20240312");
        assert!(dashboard.days[1].events.is_empty());

        let work = &dashboard.days[0].events[0];
        assert_eq!(work.kind, "work");
        assert!(!work.is_request);
        assert_eq!(work.name.as_deref(), Some("Engine 1"));
        assert_eq!(work.location.as_deref(), Some("Station 1"));
        assert_eq!(work.time.as_deref(), Some("07:00 - 07:00"));
        assert_eq!(work.length.as_deref(), Some("24.00"));
        assert_eq!(work.icon_style.as_deref(), Some("background-color:      #123456;"));

        let leave = &dashboard.days[0].events[1];
        assert_eq!(leave.kind, "unknown");
        assert!(leave.is_request);
        assert_eq!(leave.exception_code.as_deref(), Some("VAC"));
        assert_eq!(leave.location, None);
        assert_eq!(leave.icon_style, None);
    }

    #[test]
    fn calendar_header_names_owner_and_range() {
        let html = format!(
            r#"<html><body><div class="listHeader">Calendar (Doe, Jane) 03/11/2024 - 03/17/2024</div>
            <div class="fullWidth">{}</div></body></html>"#,
            DAYS
        );
        let calendar = parse_calendar(&html).unwrap();
        assert_eq!(calendar.owner.as_deref(), Some("Doe, Jane"));
        assert_eq!(calendar.start.as_deref(), Some("03/11/2024"));
        assert_eq!(calendar.end.as_deref(), Some("03/17/2024"));
        assert_eq!(calendar.days.len(), 2);
    }

    #[test]
    fn calendar_days_come_from_the_content_column() {
        let html = format!(
            r#"<html><body>
            <div class="sidebar">
              <div class="calendarDay"><div class="dateDiv">Friday, March 8, 2024</div></div>
            </div>
            <div class="listHeader">Calendar (Doe, Jane) 03/11/2024 - 03/17/2024</div>
            <div class="fullWidth">{}</div></body></html>"#,
            DAYS
        );
        let calendar = parse_calendar(&html).unwrap();
        let dates: Vec<_> = calendar.days.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, ["20240311", "20240312"]);
    }

    #[test]
    fn dashboard_without_range_is_a_layout_error() {
        assert!(matches!(
            parse_dashboard(DAYS),
            Err(TelestaffError::UnexpectedLayout { .. })
        ));
    }

    #[test]
    fn unreadable_day_is_a_layout_error() {
        let html = r#"<span class="dateRange">x</span>
            <div class="calendarDay"><div class="dateDiv">someday</div></div>"#;
        assert!(matches!(
            parse_dashboard(html),
            Err(TelestaffError::UnexpectedLayout { .. })
        ));
    }

    #[test]
    fn empty_page_is_not_a_calendar() {
        assert!(matches!(
            parse_calendar("<html><body></body></html>"),
            Err(TelestaffError::UnexpectedLayout { .. })
        ));
    }
}
