//! Response parsing.
//!
//! Portal pages come back either as JSON (export mode) or as HTML that has to
//! be scraped. Both paths end in a `serde_json::Value` so callers see one
//! shape regardless of how the portal delivered it.

mod calendar;
mod forms;
mod roster;

pub use calendar::{parse_calendar, parse_dashboard};
pub use forms::{csrf_token, is_login_form, picklist_form};
pub use roster::{parse_name_field, parse_roster};

use crate::{
    error::{TelestaffError, TelestaffResult},
    resource::ReportKind,
};
use scraper::{ElementRef, Selector};
use serde_json::Value;

/// Parse a response body for `kind`.
///
/// With `expect_json` the body is deserialized as-is; otherwise the kind's
/// HTML scraper runs over it.
pub fn parse(kind: ReportKind, body: &str, expect_json: bool) -> TelestaffResult<Value> {
    if expect_json {
        parse_json(body)
    } else {
        parse_html(kind, body)
    }
}

/// Deserialize a JSON export body unchanged
pub fn parse_json(body: &str) -> TelestaffResult<Value> {
    serde_json::from_str(body).map_err(|e| TelestaffError::malformed(e.to_string(), body))
}

/// Scrape an HTML page for `kind`
pub fn parse_html(kind: ReportKind, body: &str) -> TelestaffResult<Value> {
    let value = match kind {
        ReportKind::Roster | ReportKind::RosterFull => serde_json::to_value(parse_roster(body)?)?,
        ReportKind::Calendar => serde_json::to_value(parse_calendar(body)?)?,
        ReportKind::Dashboard => serde_json::to_value(parse_dashboard(body)?)?,
        ReportKind::Picklist => {
            return Err(TelestaffError::invalid_param(
                "picklist data is only published as JSON",
            ))
        }
    };
    Ok(value)
}

/// Compile one of this module's selectors
pub(crate) fn selector(css: &str) -> TelestaffResult<Selector> {
    Selector::parse(css)
        .map_err(|e| TelestaffError::invalid_param(format!("invalid selector {}: {:?}", css, e)))
}

/// Trimmed text with embedded line breaks and tabs removed
pub(crate) fn clean_string(text: &str) -> String {
    text.trim().replace(['\n', '\r', '\t'], "")
}

/// Text content of an element
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

/// Cleaned text of the first descendant matching `css`; `None` when absent or empty
pub(crate) fn clean_text_of(element: ElementRef<'_>, css: &str) -> TelestaffResult<Option<String>> {
    let sel = selector(css)?;
    Ok(element
        .select(&sel)
        .next()
        .map(|found| clean_string(&element_text(found)))
        .filter(|text| !text.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_export_is_returned_unchanged() {
        let body = r#"{"entries":[{"name":"Doe, Jane","rank":1},{"name":"Roe, Rick","rank":2}]}"#;
        let parsed = parse(ReportKind::Roster, body, true).unwrap();
        let expected: Value = serde_json::from_str(body).unwrap();
        assert_eq!(parsed, expected);
        assert_eq!(parsed["entries"][1]["name"], json!("Roe, Rick"));
    }

    #[test]
    fn malformed_json_is_reported_as_such() {
        for body in ["{\"entries\": [", "<html></html>", ""] {
            let err = parse(ReportKind::Roster, body, true).unwrap_err();
            assert!(
                matches!(err, TelestaffError::MalformedResponse { .. }),
                "unexpected error for {:?}: {:?}",
                body,
                err
            );
        }
    }

    #[test]
    fn html_without_roster_is_a_layout_error() {
        let err = parse(ReportKind::Roster, "<html><body>Please log in</body></html>", false)
            .unwrap_err();
        match err {
            TelestaffError::UnexpectedLayout { excerpt, .. } => {
                assert!(excerpt.contains("Please log in"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn picklist_has_no_html_form() {
        assert!(matches!(
            parse(ReportKind::Picklist, "<html></html>", false),
            Err(TelestaffError::InvalidParameter(_))
        ));
    }

    #[test]
    fn clean_string_strips_layout_whitespace() {
        assert_eq!(clean_string("\n\t 0700 -\r\n 0700 \t"), "0700 - 0700");
    }
}
