use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::config::FetcherConfig;
use crate::error::cinwiki::FetchError;
use crate::model::course::CourseQuery;

/// Anything that can hand back the HTML of a course page.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, query: &CourseQuery) -> Result<String, FetchError>;
}

/// Fetches course pages from the CInWiki over HTTP.
pub struct WikiFetcher {
    client: Client,
    base_url: String,
}

impl WikiFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        if let Ok(agent) = HeaderValue::from_str(&config.user_agent) {
            headers.insert(USER_AGENT, agent);
        } else {
            log::warn!("ignoring invalid user agent {:?}", config.user_agent);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| FetchError::Request {
                url: config.base_url.clone(),
                source,
            })?;

        Ok(WikiFetcher {
            client,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PageSource for WikiFetcher {
    async fn fetch(&self, query: &CourseQuery) -> Result<String, FetchError> {
        let url = query.page_url(&self.base_url);
        log::debug!("fetching {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| FetchError::from_reqwest(&url, err))?;

        let text = response
            .text()
            .await
            .map_err(|err| FetchError::from_reqwest(&url, err))?;
        log::debug!("fetched {} bytes from {}", text.len(), url);
        Ok(text)
    }
}
