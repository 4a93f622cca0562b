use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use log::{info, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::scraper::Candidate;

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
const MAX_PAGES: usize = 10;
pub const MISSING_TITLE: &str = "N/A";

pub trait SearchProvider {
    /// Up to `max_results` hits, in the order the service ranks them.
    fn search(&self, query: &str, max_results: usize) -> Result<Vec<Candidate>>;
}

pub struct SearchEngine {
    client: Client,
}

impl SearchEngine {
    pub fn new(user_agent: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let ua = HeaderValue::from_str(user_agent)
            .map_err(|e| Error::InvalidRequest(format!("bad user agent: {}", e)))?;
        headers.insert(USER_AGENT, ua);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()?;

        Ok(SearchEngine { client })
    }

    fn fetch_page(&self, query: &str, offset: usize) -> Result<String> {
        let encoded_query = urlencoding::encode(query);
        let search_url = if offset == 0 {
            format!("{}?q={}", SEARCH_URL, encoded_query)
        } else {
            format!("{}?q={}&s={}", SEARCH_URL, encoded_query, offset)
        };

        let resp = self.client.get(&search_url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: search_url,
                status: status.as_u16(),
            });
        }
        let text = resp.text()?;
        if is_rate_limited(&text) {
            return Err(Error::Search("rate limited by DuckDuckGo".to_string()));
        }
        Ok(text)
    }
}

impl SearchProvider for SearchEngine {
    fn search(&self, query: &str, max_results: usize) -> Result<Vec<Candidate>> {
        info!("Searching for: '{}' (up to {} results)", query, max_results);

        let mut results: Vec<Candidate> = Vec::new();
        let mut seen = HashSet::new();
        // Position in DuckDuckGo's own ranking, ads and repeats included.
        let mut offset = 0;

        for _ in 0..MAX_PAGES {
            if results.len() >= max_results {
                break;
            }
            let html = self.fetch_page(query, offset)?;
            let page = parse_duckduckgo_results(&html);
            if page.anchors == 0 {
                break;
            }
            offset += page.anchors;

            let before = results.len();
            for candidate in page.candidates {
                if results.len() >= max_results {
                    break;
                }
                if candidate.url.is_empty() || seen.insert(candidate.url.clone()) {
                    results.push(candidate);
                }
            }
            if results.len() == before {
                break;
            }
        }

        if results.is_empty() {
            warn!("No results for '{}'", query);
        }
        Ok(results)
    }
}

fn is_rate_limited(html: &str) -> bool {
    html.contains("anomaly-modal") || html.contains("anomaly.js")
}

/// One page of DuckDuckGo hits.
#[derive(Debug, Default, PartialEq)]
pub struct ResultsPage {
    pub candidates: Vec<Candidate>,
    /// Every result link on the page, sponsored ones included.
    pub anchors: usize,
}

/// DDG HTML uses specific classes. `.result__a` is the link title.
pub fn parse_duckduckgo_results(html: &str) -> ResultsPage {
    let document = Html::parse_document(html);
    let selector = match Selector::parse(".result__a") {
        Ok(s) => s,
        Err(_) => return ResultsPage::default(),
    };

    let mut page = ResultsPage::default();
    for element in document.select(&selector) {
        page.anchors += 1;
        let href = element.value().attr("href").unwrap_or("");
        // Sponsored links go through the ad redirector.
        if href.contains("duckduckgo.com/y.js") {
            continue;
        }

        let title = element.text().collect::<String>().trim().to_string();
        let title = if title.is_empty() { MISSING_TITLE.to_string() } else { title };
        page.candidates.push(Candidate::new(title, resolve_redirect(href)));
    }
    page
}

/// Unwraps `//duckduckgo.com/l/?uddg=<target>` links; other hrefs pass through.
fn resolve_redirect(href: &str) -> String {
    if !href.contains("duckduckgo.com/l/") {
        return href.to_string();
    }
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };
    Url::parse(&absolute)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "uddg")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or_default()
}
