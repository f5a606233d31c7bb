use scraper::{ElementRef, Html};
use tracing::debug;
use url::Url;

use crate::html::selector;

const STATUS_ACTIVE: &str = "Active";
const PARAM_IDENTITY: &str = "KimlikId";
const PARAM_STUDENT_NO: &str = "OgrenciNo";
const PARAM_RETURN_URL: &str = "ReturnUrl";

/// A student identity picked from the portal's identity-selection page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub identity_id: String,
    pub student_number: String,
    pub return_url: String,
}

impl Identity {
    /// Selection URL for this identity, rooted at the portal's selection endpoint.
    pub fn selection_url(&self, endpoint: &Url) -> Url {
        let mut url = endpoint.clone();
        url.query_pairs_mut()
            .append_pair(PARAM_IDENTITY, &self.identity_id)
            .append_pair(PARAM_STUDENT_NO, &self.student_number)
            .append_pair(PARAM_RETURN_URL, &self.return_url);
        url
    }
}

/// Find the single identity card whose status reads "Active".
///
/// Returns `None` when there are no cards, when no card (or more than one) is
/// active, or when the active card's link lacks one of the expected parameters.
/// Relative links resolve against `page_url`.
pub fn find_active_identity(html_str: &str, page_url: &Url) -> Option<Identity> {
    let document = Html::parse_document(html_str);
    let card_sel = selector(".card")?;

    // Wrapper cards hold the identity cards; only the innermost ones carry a status.
    let active: Vec<ElementRef> = document
        .select(&card_sel)
        .filter(|card| !card.select(&card_sel).any(|inner| inner.id() != card.id()))
        .filter(|card| is_active(card))
        .collect();

    if active.len() != 1 {
        debug!(active = active.len(), "no unique active identity card");
        return None;
    }

    let link_sel = selector("a[href]")?;
    let href = active[0].select(&link_sel).next()?.value().attr("href")?;
    let link = page_url.join(href).ok()?;

    let param = |name: &str| {
        link.query_pairs()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.into_owned())
    };

    Some(Identity {
        identity_id: param(PARAM_IDENTITY)?,
        student_number: param(PARAM_STUDENT_NO)?,
        return_url: param(PARAM_RETURN_URL)?,
    })
}

fn is_active(card: &ElementRef) -> bool {
    card.text().any(|t| t.trim() == STATUS_ACTIVE)
}
