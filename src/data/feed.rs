//! Element set sources: the Celestrak GP feed or a local TLE file

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use super::{parse_tle_text, ActiveSatellite, ElementSet};

pub const CELESTRAK_ACTIVE_TLE_URL: &str =
    "https://celestrak.org/NORAD/elements/gp.php?GROUP=active&FORMAT=tle";
pub const CELESTRAK_ACTIVE_JSON_URL: &str =
    "https://celestrak.org/NORAD/elements/gp.php?GROUP=active&FORMAT=json";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to read TLE file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Anything that can list the currently active element sets
pub trait ElementSetFeed {
    /// Element sets in catalog fetch order
    fn element_sets(&self) -> Result<Vec<ElementSet>, FeedError>;

    /// Human readable origin for log lines
    fn describe(&self) -> String;
}

/// Fetch element sets, degrading an unreachable feed to an empty list
pub fn fetch_or_empty(feed: &dyn ElementSetFeed) -> Vec<ElementSet> {
    match feed.element_sets() {
        Ok(sets) => {
            if sets.is_empty() {
                log::warn!("No valid TLEs found in {}", feed.describe());
            } else {
                log::info!("Fetched {} element sets from {}", sets.len(), feed.describe());
            }
            sets
        }
        Err(e) => {
            log::warn!("Element set feed unavailable, continuing with no data: {}", e);
            Vec::new()
        }
    }
}

/// Celestrak GP endpoint over HTTP
pub struct CelestrakFeed {
    client: reqwest::blocking::Client,
    tle_url: String,
    json_url: String,
}

impl CelestrakFeed {
    pub fn with_urls(
        timeout: Duration,
        tle_url: impl Into<String>,
        json_url: impl Into<String>,
    ) -> Result<Self, FeedError> {
        let tle_url = tle_url.into();
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("orbitwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| FeedError::Http {
                url: tle_url.clone(),
                source,
            })?;

        Ok(Self {
            client,
            tle_url,
            json_url: json_url.into(),
        })
    }

    /// Full GP records of all active satellites
    pub fn active_satellites(&self) -> Result<Vec<ActiveSatellite>, FeedError> {
        let http = |source: reqwest::Error| FeedError::Http {
            url: self.json_url.clone(),
            source,
        };

        let mut records: Vec<ActiveSatellite> = self
            .client
            .get(&self.json_url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(http)?
            .json()
            .map_err(http)?;

        let fetched_at = chrono::Utc::now();
        for record in &mut records {
            record.timestamp = Some(fetched_at);
        }

        log::info!("Fetched {} active satellite records", records.len());
        Ok(records)
    }
}

impl ElementSetFeed for CelestrakFeed {
    fn element_sets(&self) -> Result<Vec<ElementSet>, FeedError> {
        let http = |source: reqwest::Error| FeedError::Http {
            url: self.tle_url.clone(),
            source,
        };

        let text = self
            .client
            .get(&self.tle_url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(http)?
            .text()
            .map_err(http)?;

        Ok(parse_tle_text(&text))
    }

    fn describe(&self) -> String {
        self.tle_url.clone()
    }
}

/// 3-line TLE file on disk
pub struct TleFileFeed {
    path: PathBuf,
}

impl TleFileFeed {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ElementSetFeed for TleFileFeed {
    fn element_sets(&self) -> Result<Vec<ElementSet>, FeedError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| FeedError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(parse_tle_text(&text))
    }

    fn describe(&self) -> String {
        format!("{:?}", self.path)
    }
}
