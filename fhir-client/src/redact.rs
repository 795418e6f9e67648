//! Log-safe rendering of request URLs
//!
//! Search parameter values routinely carry PHI (names, birth dates, identifiers),
//! so logged URLs keep parameter names but mask values. Paging parameters stay
//! visible because they are needed to follow a pagination trail in the logs.

use reqwest::Url;

const REDACTED: &str = "***";

fn is_paging_param(name: &str) -> bool {
    name == "_count"
        || name == "_offset"
        || name == "_total"
        || name.starts_with("_getpages")
        || name.starts_with("_page")
}

/// Origin, path and query of `url` with non-paging values masked
pub fn loggable_url(url: &Url) -> String {
    let mut target = format!("{}{}", url.origin().ascii_serialization(), url.path());

    let pairs: Vec<String> = url
        .query_pairs()
        .map(|(name, value)| {
            if is_paging_param(&name) {
                format!("{}={}", name, value)
            } else {
                format!("{}={}", name, REDACTED)
            }
        })
        .collect();

    if !pairs.is_empty() {
        target.push('?');
        target.push_str(&pairs.join("&"));
    }
    target
}
