//! Probe directory collaborators: local dumps and paginated listings.

mod dump;
mod error;
mod page;
#[cfg(feature = "remote")]
mod remote;

use serde::{Deserialize, Serialize};

pub use dump::{load_dump, read_json_lines, Dump};
pub use error::DirectoryError;
pub use page::{collect_pages, Page};
#[cfg(feature = "remote")]
pub use remote::RemoteDirectory;

pub const DEFAULT_BASE_URL: &str = "https://atlas.ripe.net/api/v2/probes/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        DirectoryConfig {
            base_url: default_base_url(),
            page_size: default_page_size(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
            retries: default_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_pages: default_max_pages(),
        }
    }
}

/// Server-side narrowing of a listing. The probe filter still runs on the
/// results, so this only saves bandwidth.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingQuery {
    pub connected_only: bool,
    pub country: Option<String>,
}

impl DirectoryConfig {
    pub fn first_page_url(&self, query: &ListingQuery) -> String {
        let mut url = self.base_url.clone();
        let mut sep = if url.contains('?') { '&' } else { '?' };
        let mut push = |key: &str, value: &str| {
            url.push(sep);
            url.push_str(key);
            url.push('=');
            url.push_str(value);
            sep = '&';
        };
        push("page_size", &self.page_size.to_string());
        if query.connected_only {
            push("status", "1");
        }
        if let Some(country) = &query.country {
            push("country_code", country);
        }
        url
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_page_size() -> usize {
    500
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1_000
}

fn default_max_pages() -> usize {
    1_000
}
