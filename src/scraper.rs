use log::debug;
use std::collections::BTreeSet;

use crate::domain_filter::DomainFilter;
use crate::extractor::EmailExtractor;
use crate::fetcher::{PageFetcher, PageSource};

/// A search hit that has not been scraped yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub title: String,
    pub url: String,
}

impl Candidate {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Candidate {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// A site with at least one usable address. Emails are unique, lower-case and sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRecord {
    pub title: String,
    pub url: String,
    pub emails: Vec<String>,
}

impl ContactRecord {
    pub fn emails_display(&self) -> String {
        self.emails.join(", ")
    }
}

/// One unit of work for the worker pool.
pub trait Scrape: Send + Sync {
    fn scrape(&self, candidate: &Candidate) -> Option<ContactRecord>;
}

pub struct SiteScraper<S> {
    filter: DomainFilter,
    fetcher: PageFetcher<S>,
    extractor: EmailExtractor,
}

impl<S: PageSource> SiteScraper<S> {
    pub fn new(filter: DomainFilter, fetcher: PageFetcher<S>, extractor: EmailExtractor) -> Self {
        SiteScraper {
            filter,
            fetcher,
            extractor,
        }
    }
}

impl<S: PageSource> Scrape for SiteScraper<S> {
    fn scrape(&self, candidate: &Candidate) -> Option<ContactRecord> {
        if self.filter.is_excluded(&candidate.url) {
            debug!("Skipping excluded site: {}", candidate.url);
            return None;
        }

        let text = self.fetcher.fetch_candidate_text(&candidate.url);
        let emails: BTreeSet<String> = text
            .pages()
            .flat_map(|page| self.extractor.extract_emails(page))
            .collect();

        if emails.is_empty() {
            debug!("No emails on {}", candidate.url);
            return None;
        }

        Some(ContactRecord {
            title: candidate.title.clone(),
            url: candidate.url.clone(),
            emails: emails.into_iter().collect(),
        })
    }
}
