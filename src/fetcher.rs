use log::debug;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT, ACCEPT_LANGUAGE};
use scraper::Html;
use std::time::Duration;

use crate::config::DiscoveryConfig;
use crate::error::{Error, Result};

/// Anything that can return the body of a URL. The HTTP client in production, a map in tests.
pub trait PageSource: Send + Sync {
    fn get(&self, url: &str, timeout: Duration) -> Result<String>;
}

pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    pub fn new(user_agent: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        let ua = HeaderValue::from_str(user_agent)
            .map_err(|e| Error::InvalidRequest(format!("bad user agent: {}", e)))?;
        headers.insert(USER_AGENT, ua);

        let client = Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(HttpPageSource { client })
    }
}

impl PageSource for HttpPageSource {
    fn get(&self, url: &str, timeout: Duration) -> Result<String> {
        let resp = self.client.get(url).timeout(timeout).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp.text()?)
    }
}

/// Visible text of the primary page and of each probed contact sub-page.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CandidateText {
    pub primary: String,
    pub sub_pages: Vec<String>,
}

impl CandidateText {
    pub fn pages(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.sub_pages.iter().map(String::as_str))
    }
}

pub struct PageFetcher<S> {
    source: S,
    contact_paths: Vec<String>,
    primary_timeout: Duration,
    sub_page_timeout: Duration,
}

impl<S: PageSource> PageFetcher<S> {
    pub fn new(source: S, config: &DiscoveryConfig) -> Self {
        PageFetcher {
            source,
            contact_paths: config.contact_paths.clone(),
            primary_timeout: config.primary_timeout,
            sub_page_timeout: config.sub_page_timeout,
        }
    }

    /// Never fails: every request that errors simply contributes no text.
    pub fn fetch_candidate_text(&self, url: &str) -> CandidateText {
        let mut result = CandidateText::default();

        match self.source.get(url, self.primary_timeout) {
            Ok(html) => result.primary = visible_text(&html),
            // Host answered, the sub-pages may still exist.
            Err(e @ Error::Status { .. }) => debug!("Primary page skipped: {}", e),
            Err(e) => {
                debug!("Failed to fetch {}: {}", url, e);
                return result;
            }
        }

        let base = url.trim_end_matches('/');
        for path in &self.contact_paths {
            let link = format!("{}{}", base, path);
            match self.source.get(&link, self.sub_page_timeout) {
                Ok(html) => result.sub_pages.push(visible_text(&html)),
                Err(e) => debug!("Failed to fetch {}: {}", link, e),
            }
        }

        result
    }
}

/// Text nodes of the document, excluding script-like containers.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::new();

    for node in document.tree.root().descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor.value().as_element().map_or(false, |el| {
                matches!(el.name(), "script" | "style" | "noscript" | "template")
            })
        });
        if !hidden {
            // Adjacent elements render apart; keep their text apart too.
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(fragment);
        }
    }
    text
}
