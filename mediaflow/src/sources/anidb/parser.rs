//! Wishlist HTML parsing.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

use crate::entry::Entry;
use crate::errors::{ConfigError, SourceError};
use crate::pagination::ResultPage;
use crate::transport::HttpResponse;

#[allow(clippy::expect_used)]
static TRAILING_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\(\d{4}\)$").expect("valid trailing year pattern"));

/// One parsed wishlist row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistEntry {
    /// Title as shown on the wishlist.
    pub title: String,
    /// Absolute link to the anime page.
    pub url: String,
    /// AniDB anime id.
    pub anidb_id: String,
    /// AniDB name; same as the title.
    pub anidb_name: String,
}

impl From<WishlistEntry> for Entry {
    fn from(item: WishlistEntry) -> Self {
        Entry::new(item.title)
            .with_url(item.url)
            .with_field("anidb_id", serde_json::json!(item.anidb_id))
            .with_field("anidb_name", serde_json::json!(item.anidb_name))
    }
}

/// Removes a trailing ` (YYYY)` from a title.
#[must_use]
pub fn strip_trailing_year(title: &str) -> String {
    TRAILING_YEAR_RE.replace(title, "").into_owned()
}

fn selector(css: &str, url: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::malformed(url, format!("selector {css}: {e:?}")))
}

/// Parses wishlist pages, resolving links against a base URL.
#[derive(Debug, Clone)]
pub struct WishlistParser {
    base: Url,
    strip_dates: bool,
}

impl WishlistParser {
    /// Creates a parser for pages under `base`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `base` is not an absolute URL.
    pub fn new(base: &str, strip_dates: bool) -> Result<Self, ConfigError> {
        let base = Url::parse(base).map_err(|e| ConfigError::Invalid(format!("base URL '{base}': {e}")))?;
        Ok(Self { base, strip_dates })
    }

    fn join(&self, href: &str, url: &str) -> Result<String, SourceError> {
        self.base
            .join(href)
            .map(String::from)
            .map_err(|e| SourceError::malformed(url, format!("bad link '{href}': {e}")))
    }

    fn parse_row(&self, row: ElementRef<'_>, link: &Selector, url: &str) -> Result<Option<WishlistEntry>, SourceError> {
        let Some(anchor) = row.select(link).next() else {
            debug!("No title link found for the row, skipping");
            return Ok(None);
        };
        let Some(href) = anchor.value().attr("href") else {
            debug!("Title link has no href, skipping");
            return Ok(None);
        };

        let text: String = anchor.text().collect();
        let text = text.trim();
        let title = if self.strip_dates {
            strip_trailing_year(text)
        } else {
            text.to_string()
        };

        let row_id = row.value().attr("id").unwrap_or_default();
        let anidb_id = row_id.strip_prefix('a').unwrap_or(row_id).to_string();
        debug!(title = %title, anidb_id = %anidb_id, "Parsed wishlist row");

        Ok(Some(WishlistEntry {
            anidb_name: title.clone(),
            url: self.join(href, url)?,
            title,
            anidb_id,
        }))
    }

    /// Parses one wishlist page.
    ///
    /// A page without rows, or without a next link, ends the read.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if the page has no wishlist table or a link
    /// cannot be resolved.
    pub fn parse(&self, response: &HttpResponse) -> Result<ResultPage<WishlistEntry>, SourceError> {
        let url = response.final_url.as_str();
        let document = Html::parse_document(&response.text);

        let table = selector("table.wishlist", url)?;
        let rows = selector("table.wishlist tbody tr", url)?;
        let name_link = selector("td.name a", url)?;
        let next_link = selector("li.next a[href]", url)?;

        if document.select(&table).next().is_none() {
            return Err(SourceError::malformed(
                url,
                "no wishlist table; the list may be private or missing",
            ));
        }

        let rows: Vec<ElementRef<'_>> = document.select(&rows).collect();
        if rows.is_empty() {
            debug!(url = %url, "No entries on wishlist page");
            return Ok(ResultPage::last(Vec::new()));
        }

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(item) = self.parse_row(row, &name_link, url)? {
                items.push(item);
            }
        }

        let next = document
            .select(&next_link)
            .next()
            .and_then(|anchor| anchor.value().attr("href"));
        match next {
            Some(href) => Ok(ResultPage::next_url(items, self.join(href, url)?)),
            None => {
                debug!(url = %url, "No more pages on the wishlist");
                Ok(ResultPage::last(items))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::Continuation;
    use crate::testing::fixtures;
    use pretty_assertions::assert_eq;

    const BASE: &str = "http://anidb.net/perl-bin/";

    fn parser(strip_dates: bool) -> WishlistParser {
        WishlistParser::new(BASE, strip_dates).unwrap()
    }

    #[test]
    fn test_parses_rows_and_next_link() {
        let html = fixtures::wishlist_page(
            &[
                ("a22", "animedb.pl?show=anime&aid=22", "Neon Genesis Evangelion"),
                ("a5975", "animedb.pl?show=anime&aid=5975", "Toradora! (2008)"),
            ],
            Some("animedb.pl?show=mywishlist&uid=1&page=1"),
        );
        let page = parser(false)
            .parse(&fixtures::html_response(html).with_url("http://anidb.net/perl-bin/animedb.pl"))
            .unwrap();

        assert_eq!(
            page.continuation,
            Continuation::NextUrl("http://anidb.net/perl-bin/animedb.pl?show=mywishlist&uid=1&page=1".to_string())
        );
        assert_eq!(
            page.items[0],
            WishlistEntry {
                title: "Neon Genesis Evangelion".to_string(),
                url: "http://anidb.net/perl-bin/animedb.pl?show=anime&aid=22".to_string(),
                anidb_id: "22".to_string(),
                anidb_name: "Neon Genesis Evangelion".to_string(),
            }
        );
        assert_eq!(page.items[1].title, "Toradora! (2008)");
    }

    #[test]
    fn test_strip_dates() {
        let html = fixtures::wishlist_page(&[("a5975", "animedb.pl?aid=5975", "Toradora! (2008)")], None);
        let page = parser(true).parse(&fixtures::html_response(html)).unwrap();

        assert_eq!(page.items[0].title, "Toradora!");
        assert_eq!(page.items[0].anidb_name, "Toradora!");
        assert_eq!(page.continuation, Continuation::Exhausted);

        assert_eq!(strip_trailing_year("Hellsing (2001) Ultimate"), "Hellsing (2001) Ultimate");
        assert_eq!(strip_trailing_year("Hellsing  (2001)"), "Hellsing");
    }

    #[test]
    fn test_row_without_link_is_skipped() {
        let html = r#"<table class="wishlist"><tbody>
            <tr id="a1"><td class="name">Unlinked</td></tr>
            <tr id="a2"><td class="name"><a href="animedb.pl?aid=2">Linked</a></td></tr>
        </tbody></table>"#;
        let page = parser(false).parse(&fixtures::html_response(html)).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].anidb_id, "2");
    }

    #[test]
    fn test_empty_table_is_exhausted() {
        let html = r#"<table class="wishlist"><tbody></tbody></table>
            <ul><li class="next"><a href="animedb.pl?page=2">next</a></li></ul>"#;
        let page = parser(false).parse(&fixtures::html_response(html)).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.continuation, Continuation::Exhausted);
    }

    #[test]
    fn test_missing_table_is_source_error() {
        let err = parser(false)
            .parse(&fixtures::html_response("<html><body>This list is private</body></html>"))
            .unwrap_err();
        assert!(err.reason.contains("no wishlist table"));
    }

    #[test]
    fn test_into_entry() {
        let entry: Entry = WishlistEntry {
            title: "Monster".to_string(),
            url: "http://anidb.net/perl-bin/animedb.pl?aid=1".to_string(),
            anidb_id: "1".to_string(),
            anidb_name: "Monster".to_string(),
        }
        .into();
        assert_eq!(entry.title, "Monster");
        assert_eq!(entry.field("anidb_id"), Some(&serde_json::json!("1")));
    }
}
