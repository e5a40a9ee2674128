use super::selector;
use crate::{
    error::{TelestaffError, TelestaffResult},
    models::PicklistForm,
};
use scraper::Html;

/// Value of the `CSRFToken` hidden input, if the page has one
pub fn csrf_token(body: &str) -> TelestaffResult<Option<String>> {
    let document = Html::parse_document(body);
    input_value(&document, "CSRFToken")
}

/// Whether the page is the portal's login form; seeing it after a request
/// means the session was not accepted.
pub fn is_login_form(body: &str) -> bool {
    let document = Html::parse_document(body);
    selector(r#"form input[type="password"]"#)
        .map(|sel| document.select(&sel).next().is_some())
        .unwrap_or(false)
}

/// Hidden fields of the picklist page
pub fn picklist_form(body: &str) -> TelestaffResult<PicklistForm> {
    let document = Html::parse_document(body);
    let missing = |field: &str| TelestaffError::layout(format!("Picklist form has no {}", field), body);

    Ok(PicklistForm {
        date: input_value(&document, "date")?.ok_or_else(|| missing("date"))?,
        region: selected_option(&document, "regionTbl")?.ok_or_else(|| missing("regionTbl"))?,
        shift: selected_option(&document, "shiftTbl")?.ok_or_else(|| missing("shiftTbl"))?,
        csrf_token: input_value(&document, "CSRFToken")?.ok_or_else(|| missing("CSRFToken"))?,
    })
}

fn input_value(document: &Html, name: &str) -> TelestaffResult<Option<String>> {
    let sel = selector(&format!(r#"input[name="{}"]"#, name))?;
    Ok(document
        .select(&sel)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::to_string))
}

fn selected_option(document: &Html, name: &str) -> TelestaffResult<Option<String>> {
    let sel = selector(&format!(r#"select[name="{}"] option[selected]"#, name))?;
    Ok(document
        .select(&sel)
        .next()
        .and_then(|option| option.value().attr("value"))
        .map(str::to_string))
}
