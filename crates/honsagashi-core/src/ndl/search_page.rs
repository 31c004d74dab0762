//! Export-token lookup on the HTML search page.
//!
//! The JSON export endpoint is keyed by an opaque `f-token` (in practice
//! `{dpid}-{ndlbibid}`), which NDL Search only exposes as the `id` of the link
//! in each search result heading.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static RESULT_LINK: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.search-result-item h3 a").expect("valid selector")
});

/// Export token of the first search result, if the page lists any.
pub fn extract_export_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&RESULT_LINK)
        .next()
        .and_then(|a| a.value().attr("id"))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToOwned::to_owned)
}
