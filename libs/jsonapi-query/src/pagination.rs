//! Navigation links for paginated collections.

use serde::Serialize;
use url::Url;

use crate::Pagination;

const PAGE_NUMBER: &str = "page[number]";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    pub first: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// Compute `self`/`first`/`last`/`prev`/`next` for a collection of `total` items.
///
/// Every link except `self` is the request URL with `page[number]` rewritten;
/// all other parameters are preserved. A window past the last page is not an
/// error: it gets `prev` but no `next`.
#[must_use]
pub fn pagination_links(total: u64, page: Pagination, request_url: &Url) -> PaginationLinks {
    let size = page.size.max(1);

    let last = (total > 0).then(|| total.div_ceil(size) - 1);
    let prev = page.number.checked_sub(1);
    let next = (page.number.saturating_add(1).saturating_mul(size) < total)
        .then(|| page.number.saturating_add(1));

    PaginationLinks {
        self_link: request_url.as_str().to_owned(),
        first: page_url(request_url, 0),
        last: last.map(|n| page_url(request_url, n)),
        prev: prev.map(|n| page_url(request_url, n)),
        next: next.map(|n| page_url(request_url, n)),
    }
}

fn page_url(base: &Url, number: u64) -> String {
    let retained: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(key, _)| key != PAGE_NUMBER)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut url = base.clone();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair(PAGE_NUMBER, &number.to_string());
    url.into()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn first_page_of_fifty() {
        let links = pagination_links(
            50,
            Pagination::new(0, 10),
            &url("http://localhost/api/v1/students/"),
        );
        assert_eq!(links.self_link, "http://localhost/api/v1/students/");
        assert_eq!(
            links.first,
            "http://localhost/api/v1/students/?page%5Bnumber%5D=0"
        );
        assert_eq!(
            links.next.as_deref(),
            Some("http://localhost/api/v1/students/?page%5Bnumber%5D=1")
        );
        assert_eq!(
            links.last.as_deref(),
            Some("http://localhost/api/v1/students/?page%5Bnumber%5D=4")
        );
        assert!(links.prev.is_none());
    }

    #[test]
    fn last_page_of_fifty() {
        let links = pagination_links(
            50,
            Pagination::new(4, 10),
            &url("http://localhost/students?page%5Bnumber%5D=4&page%5Bsize%5D=10"),
        );
        assert!(links.next.is_none());
        assert_eq!(
            links.prev.as_deref(),
            Some("http://localhost/students?page%5Bsize%5D=10&page%5Bnumber%5D=3")
        );
        assert!(links.last.unwrap().ends_with("page%5Bnumber%5D=4"));
    }

    #[test]
    fn middle_page_preserves_other_parameters() {
        let links = pagination_links(
            50,
            Pagination::new(2, 10),
            &url("http://localhost/students?sort=-age&page%5Bnumber%5D=2"),
        );
        assert_eq!(
            links.next.as_deref(),
            Some("http://localhost/students?sort=-age&page%5Bnumber%5D=3")
        );
        assert_eq!(
            links.prev.as_deref(),
            Some("http://localhost/students?sort=-age&page%5Bnumber%5D=1")
        );
    }

    #[test]
    fn empty_collection_has_only_self_and_first() {
        let links = pagination_links(0, Pagination::default(), &url("http://localhost/students"));
        let json = serde_json::to_value(&links).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["first", "self"]);
    }

    #[test]
    fn window_past_the_end_has_prev_but_no_next() {
        let links = pagination_links(5, Pagination::new(7, 10), &url("http://localhost/students"));
        assert!(links.next.is_none());
        assert!(links.prev.unwrap().ends_with("page%5Bnumber%5D=6"));
        assert!(links.last.unwrap().ends_with("page%5Bnumber%5D=0"));
    }

    #[test]
    fn uneven_last_page() {
        let links = pagination_links(51, Pagination::new(4, 10), &url("http://localhost/s"));
        assert!(links.next.unwrap().ends_with("page%5Bnumber%5D=5"));
        assert!(links.last.unwrap().ends_with("page%5Bnumber%5D=5"));
    }
}
