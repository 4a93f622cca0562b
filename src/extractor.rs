use regex::Regex;
use std::collections::BTreeSet;

use crate::config::JUNK_EMAIL_PATTERNS;

pub struct EmailExtractor {
    email_regex: Regex,
    junk_patterns: Vec<String>,
}

impl Default for EmailExtractor {
    fn default() -> Self {
        EmailExtractor::new()
    }
}

impl EmailExtractor {
    pub fn new() -> Self {
        EmailExtractor::with_junk_patterns(JUNK_EMAIL_PATTERNS.iter().map(|p| p.to_string()))
    }

    pub fn with_junk_patterns<I>(junk_patterns: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        EmailExtractor {
            email_regex: Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}")
                .expect("email pattern is a valid regex"),
            junk_patterns: junk_patterns.into_iter().collect(),
        }
    }

    /// Lower-cased, de-duplicated addresses found in `text`, minus junk.
    pub fn extract_emails(&self, text: &str) -> BTreeSet<String> {
        self.email_regex
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .filter(|email| !self.is_junk(email))
            .collect()
    }

    pub fn is_junk(&self, email: &str) -> bool {
        self.junk_patterns.iter().any(|j| email.contains(j.as_str()))
    }
}
