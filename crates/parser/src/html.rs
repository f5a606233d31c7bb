use std::collections::HashMap;

use scraper::{Html, Selector};

pub(crate) fn selector(s: &str) -> Option<Selector> {
    Selector::parse(s).ok()
}

/// Values of every named hidden input in the document (view-state and
/// anti-forgery tokens on server-rendered forms). A missing `value` maps to "".
pub fn hidden_inputs(html_str: &str) -> HashMap<String, String> {
    let document = Html::parse_document(html_str);
    let Some(sel) = selector("input[type='hidden'][name]") else {
        return HashMap::new();
    };

    document
        .select(&sel)
        .filter_map(|el| {
            let name = el.value().attr("name")?;
            let value = el.value().attr("value").unwrap_or("");
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// True when the document carries a `<form>` element.
///
/// The token endpoint answers with a bare token on success and re-serves the
/// login page otherwise, so this doubles as the "still logged out" check.
pub fn contains_form(html_str: &str) -> bool {
    let document = Html::parse_document(html_str);
    selector("form")
        .map(|s| document.select(&s).next().is_some())
        .unwrap_or(false)
}
