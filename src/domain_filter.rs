use crate::config::EXCLUDED_DOMAINS;

/// Rejects URLs on hosts that are not worth scraping for contacts.
#[derive(Debug, Clone)]
pub struct DomainFilter {
    excluded: Vec<String>,
}

impl Default for DomainFilter {
    fn default() -> Self {
        DomainFilter::new(EXCLUDED_DOMAINS.iter().map(|d| d.to_string()))
    }
}

impl DomainFilter {
    pub fn new<I>(excluded: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        DomainFilter {
            excluded: excluded.into_iter().filter(|d| !d.is_empty()).collect(),
        }
    }

    /// Default table plus caller supplied domains.
    pub fn with_extra<I>(extra: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut filter = DomainFilter::default();
        filter
            .excluded
            .extend(extra.into_iter().map(|d| d.trim().to_lowercase()).filter(|d| !d.is_empty()));
        filter
    }

    pub fn is_excluded(&self, url: &str) -> bool {
        self.excluded.iter().any(|d| url.contains(d.as_str()))
    }
}
