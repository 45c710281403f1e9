use std::collections::BTreeSet;

use docwatch_logging::{watch_info, watch_warn};
use scraper::{Html, Selector};
use url::Url;

use crate::decode::decode_body;
use crate::fetch::Fetcher;
use crate::ScanError;

/// Collects documentation page URLs from a listing page.
///
/// Only anchors whose `href` starts with `prefix` are kept. Fragments are
/// stripped, the result is absolute, deduplicated and sorted.
pub fn discover_links(listing_html: &str, base_url: &Url, prefix: &str) -> Vec<String> {
    let document = Html::parse_document(listing_html);
    let Ok(anchors) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut found = BTreeSet::new();
    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };
        if !href.starts_with(prefix) {
            continue;
        }
        match base_url.join(href) {
            Ok(mut url) => {
                url.set_fragment(None);
                found.insert(url.to_string());
            }
            Err(err) => watch_warn!("Skipping unresolvable link {:?}: {}", href, err),
        }
    }
    found.into_iter().collect()
}

/// Fetches the listing page and discovers the pages to check.
#[derive(Debug, Clone)]
pub struct LinkDiscovery {
    listing_url: Url,
    prefix: String,
}

impl LinkDiscovery {
    pub fn new(listing_url: Url, prefix: impl Into<String>) -> Self {
        Self {
            listing_url,
            prefix: prefix.into(),
        }
    }

    pub async fn discover(&self, fetcher: &dyn Fetcher) -> Result<Vec<String>, ScanError> {
        let listing = fetcher
            .fetch(self.listing_url.as_str())
            .await
            .map_err(ScanError::Listing)?;
        let html = decode_body(&listing)?;
        let base = Url::parse(&listing.metadata.final_url)
            .unwrap_or_else(|_| self.listing_url.clone());
        let urls = discover_links(&html, &base, &self.prefix);
        watch_info!(
            "Discovered {} pages under {} on {}",
            urls.len(),
            self.prefix,
            self.listing_url
        );
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::discover_links;
    use url::Url;

    fn base() -> Url {
        Url::parse("https://docs.example.com/docs").unwrap()
    }

    #[test]
    fn keeps_only_prefixed_links_and_qualifies_them() {
        let html = r#"
            <a href="/docs/ledgers">Ledgers</a>
            <a href="/blog/news">News</a>
            <a href="https://elsewhere.example/docs/x">External</a>
            <a href="/docs/accounts">Accounts</a>"#;
        assert_eq!(
            discover_links(html, &base(), "/docs"),
            vec![
                "https://docs.example.com/docs/accounts".to_string(),
                "https://docs.example.com/docs/ledgers".to_string(),
            ]
        );
    }

    #[test]
    fn duplicates_and_fragments_collapse() {
        let html = r##"
            <a href="/docs/ledgers">One</a>
            <a href="/docs/ledgers#setup">Two</a>
            <a href=" /docs/ledgers ">Three</a>"##;
        assert_eq!(
            discover_links(html, &base(), "/docs"),
            vec!["https://docs.example.com/docs/ledgers".to_string()]
        );
    }

    #[test]
    fn anchors_without_href_are_ignored() {
        assert!(discover_links("<a name=\"top\">x</a>", &base(), "/docs").is_empty());
    }
}
