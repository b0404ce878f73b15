use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;

/// One page of a paginated directory listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Follow `next` links from `first_url`, concatenating every page's results.
///
/// `fetch` does the transport. A link that was already visited or more than
/// `max_pages` pages is an error rather than an endless walk.
pub fn collect_pages<T, F>(first_url: &str, max_pages: usize, mut fetch: F) -> Result<Vec<T>, DirectoryError>
where
    F: FnMut(&str) -> Result<Page<T>, DirectoryError>,
{
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut url = first_url.to_string();
    let mut pages = 0usize;

    loop {
        if pages >= max_pages {
            return Err(DirectoryError::TooManyPages(max_pages));
        }
        if !seen.insert(url.clone()) {
            return Err(DirectoryError::PaginationCycle(url));
        }
        let page = fetch(&url)?;
        pages += 1;
        log::debug!(
            "page {pages}: {} results (total {:?}) from {url}",
            page.results.len(),
            page.count
        );
        out.extend(page.results);

        match page.next {
            Some(next) if !next.trim().is_empty() => url = next,
            _ => break,
        }
    }
    Ok(out)
}
