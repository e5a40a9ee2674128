use super::{element_text, selector};
use crate::{
    error::{TelestaffError, TelestaffResult},
    models::{GroupMap, Member, Roster, RosterGroup},
};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::OnceLock;

/// Classes marking a roster level, outermost first
const LEVEL_CLASSES: [&str; 8] = [
    "idDate",
    "idInstitution",
    "idAgency",
    "idBatallion",
    "idShift",
    "idStation",
    "idUnit",
    "idPosition",
];

const LEVEL_SELECTOR: &str = "li.idDate, li.idInstitution, li.idAgency, li.idBatallion, \
     li.idShift, li.idStation, li.idUnit, li.idPosition";

const NAME_SELECTOR: &str = "div.dateName, div.organizationName, div.battalionName, \
     div.shiftName, div.unitName, div.positionName";

/// `Title {notes}`; a leading `.` marks a suppressed entry
fn title_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\{?(\.)?[^{]*)\{?([^}]*)\}?").expect("title pattern is valid")
    })
}

/// Parse a roster page into its tree of levels
pub fn parse_roster(body: &str) -> TelestaffResult<Roster> {
    let document = Html::parse_document(body);
    let list_sel = selector("ol.rosterTableList")?;
    let list = document
        .select(&list_sel)
        .next()
        .ok_or_else(|| TelestaffError::layout("No roster found", body))?;

    Ok(Roster {
        groups: parse_levels(list)?,
    })
}

/// First roster level below `scope` together with its same-level siblings
fn parse_levels(scope: ElementRef<'_>) -> TelestaffResult<GroupMap> {
    let level_sel = selector(LEVEL_SELECTOR)?;
    let mut groups = GroupMap::default();

    let Some(first) = scope.select(&level_sel).next() else {
        return Ok(groups);
    };

    let siblings = first
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "li" && level_class(*el).is_some());

    for li in std::iter::once(first).chain(siblings) {
        let Some(class) = level_class(li) else {
            continue;
        };
        let level = &class[2..];

        let mut group = parse_name_field(li)?;
        if level == "Position" {
            group.member = Some(parse_member(li)?);
        } else if li.select(&level_sel).next().is_some() {
            group.children = parse_levels(li)?;
        }
        groups.push(level, group);
    }

    Ok(groups)
}

fn level_class(element: ElementRef<'_>) -> Option<&'static str> {
    let classes = element.value().attr("class")?;
    classes
        .split_whitespace()
        .find_map(|class| LEVEL_CLASSES.iter().copied().find(|level| *level == class))
}

/// Title, notes and suppression flag from a level's name div
pub fn parse_name_field(element: ElementRef<'_>) -> TelestaffResult<RosterGroup> {
    let mut group = RosterGroup::default();
    let name_sel = selector(NAME_SELECTOR)?;
    let Some(name_div) = element.select(&name_sel).next() else {
        return Ok(group);
    };

    let span_sel = selector("span")?;
    let first_span = name_div
        .select(&span_sel)
        .next()
        .map(|span| element_text(span).trim().to_string())
        .unwrap_or_default();
    let title = if first_span.is_empty() {
        let text_sel = selector("span.positionNameText")?;
        name_div
            .select(&text_sel)
            .next()
            .map(element_text)
            .unwrap_or_default()
    } else {
        first_span
    };

    group.title = title.clone();
    if let Some(caps) = title_pattern().captures(&title) {
        if let Some(name) = caps.get(1).filter(|m| !m.as_str().is_empty()) {
            group.title = name.as_str().trim().to_string();
        }
        group.is_suppressed = caps.get(2).is_some();
        if let Some(notes) = caps.get(3).filter(|m| !m.as_str().is_empty()) {
            if !group.is_suppressed {
                group.notes = notes.as_str().trim().to_string();
            }
        }
    }

    Ok(group)
}

fn find_first<'a>(element: ElementRef<'a>, css: &str) -> TelestaffResult<Option<ElementRef<'a>>> {
    let sel = selector(css)?;
    Ok(element.select(&sel).next())
}

fn attr_of(element: Option<ElementRef<'_>>, name: &str) -> Option<String> {
    element.and_then(|el| el.value().attr(name).map(str::to_string))
}

/// Assignment details of a position entry
fn parse_member(li: ElementRef<'_>) -> TelestaffResult<Member> {
    let mut member = Member {
        id: li.value().attr("data-id").unwrap_or_default().to_string(),
        is_working: find_first(li, "div.nonWorking")?.is_none(),
        is_assigned: find_first(li, "div.unassignedPosition")?.is_none(),
        is_vacant: find_first(li, "div.vacancyDisplay")?.is_some(),
        ..Member::default()
    };

    let resource = find_first(li, r#"div[data-field="resourcedisplay"]"#)?;
    if let Some(name) = attr_of(resource, "data-popup-title") {
        member.name = name;
    }
    if let Some(specialties) = attr_of(resource, "data-popup-specialties") {
        member.specialties = specialties;
    }

    if let Some(badge) = attr_of(find_first(li, r#"div[data-field="idcolumn"]"#)?, "data-id") {
        member.badge = badge;
    }

    if let Some(codes) = find_first(li, r#"div[data-field="workcode"]"#)? {
        parse_workcode(codes, &mut member)?;
    }

    if let Some(start) = attr_of(
        find_first(li, r#"div.shiftTimes[data-popup-title="From"]"#)?,
        "data-popup-value",
    ) {
        member.start_time = start;
    }
    if let Some(end) = attr_of(
        find_first(li, r#"div.shiftTimes[data-popup-title="Through"]"#)?,
        "data-popup-value",
    ) {
        member.end_time = end;
    }
    if let Some(duration) = attr_of(find_first(li, "div.shiftDuration")?, "data-popup-value") {
        member.duration = duration;
    }

    Ok(member)
}

fn parse_workcode(codes: ElementRef<'_>, member: &mut Member) -> TelestaffResult<()> {
    let Some(title) = codes.value().attr("data-popup-title") else {
        return Ok(());
    };
    member.workcode = title.to_string();

    let exception = find_first(codes, "span.exceptionCode")?;
    let mut style = attr_of(exception, "style");
    // Newer portals color the code with an SVG swatch
    if let Some(fill) = attr_of(find_first(codes, "svg.svg rect")?, "style") {
        let swatch = format!("background-color: {}", fill.replace("fill:", ""));
        style = Some(style.unwrap_or_default() + &swatch);
    }
    member.workcode_style = style;

    if let Some(status) = codes.value().attr("data-popup-statusenum") {
        member.is_request = status == "APPROVAL_PENDING";
    }
    if let Some(request) = codes.value().attr("data-popup-request") {
        member.is_request = is_truthy(request);
    }
    if let Some(exception) = exception {
        member.exception_code = element_text(exception);
    }
    Ok(())
}

fn is_truthy(value: &str) -> bool {
    !matches!(value.trim().to_ascii_lowercase().as_str(), "" | "false" | "0" | "no")
}
