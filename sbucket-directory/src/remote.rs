use std::thread;
use std::time::Duration;

use sbucket_core::ProbeRecord;

use crate::error::DirectoryError;
use crate::page::{collect_pages, Page};
use crate::{DirectoryConfig, ListingQuery};

/// Blocking client for a paginated probe listing.
pub struct RemoteDirectory {
    agent: ureq::Agent,
    config: DirectoryConfig,
}

impl RemoteDirectory {
    pub fn new(config: DirectoryConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(concat!("sbucket/", env!("CARGO_PKG_VERSION")))
            .build();
        RemoteDirectory { agent, config }
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Every record of the listing, all pages concatenated.
    pub fn fetch_records(&self, query: &ListingQuery) -> Result<Vec<ProbeRecord>, DirectoryError> {
        let first = self.config.first_page_url(query);
        log::info!("fetching probe listing from {first}");
        collect_pages(&first, self.config.max_pages, |url| self.fetch_page(url))
    }

    fn fetch_page(&self, url: &str) -> Result<Page<ProbeRecord>, DirectoryError> {
        let mut attempt = 0u32;
        loop {
            match self.get_page(url) {
                Ok(page) => return Ok(page),
                Err(err) if err.is_retryable() && attempt < self.config.retries => {
                    attempt += 1;
                    let wait = Duration::from_millis(self.config.retry_backoff_ms * u64::from(attempt));
                    log::warn!("{err}; retry {attempt}/{} in {wait:?}", self.config.retries);
                    thread::sleep(wait);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn get_page(&self, url: &str) -> Result<Page<ProbeRecord>, DirectoryError> {
        let mut req = self.agent.get(url).set("Accept", "application/json");
        if let Some(key) = &self.config.api_key {
            req = req.set("Authorization", &format!("Key {key}"));
        }
        let resp = req.call().map_err(|err| match err {
            ureq::Error::Status(status, _) => DirectoryError::Status {
                status,
                url: url.to_string(),
            },
            ureq::Error::Transport(t) => DirectoryError::Transport {
                url: url.to_string(),
                message: t.to_string(),
            },
        })?;
        resp.into_json::<Page<ProbeRecord>>()
            .map_err(|source| DirectoryError::Decode {
                url: url.to_string(),
                source,
            })
    }
}
