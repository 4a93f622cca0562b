use std::time::Duration;

/// Hosts that rarely publish a usable contact address. Matched as substrings of the URL.
pub const EXCLUDED_DOMAINS: &[&str] = &[
    "wikipedia.org",
    "youtube.com",
    "instagram.com",
    "tiktok.com",
    "github.com",
    "medium.com",
    "blogspot.com",
    "wordpress.com",
    "twitter.com",
    "facebook.com",
    "linkedin.com",
    "reddit.com",
    "amazon.com",
    "ebay.com",
    "pinterest.com",
    "microsoft.com",
    "baidu.com",
    "apple.com",
    "google.com",
];

/// Substrings that mark an address as a placeholder, a role account or an image filename.
pub const JUNK_EMAIL_PATTERNS: &[&str] = &[
    "@example",
    "@test",
    "@domain",
    "@email",
    "@site",
    "@your",
    ".png",
    ".jpg",
    "noreply",
    "no-reply",
    "donotreply",
    "unsubscribe",
    "privacy@",
    "abuse@",
];

pub const CONTACT_PATHS: &[&str] = &["/contact", "/contact-us", "/about", "/support"];

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

pub const DEFAULT_TARGET_COUNT: u8 = 4;

/// Hard ceilings; a config asking for more is clamped.
pub const MAX_ROUNDS: u32 = 5;
pub const MAX_WORKERS: usize = 5;

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub max_rounds: u32,
    /// Search results requested per wanted contact, multiplied by the round number.
    pub batch_multiplier: usize,
    pub workers: usize,
    pub expansion_phrase: String,
    pub round_pause: Duration,
    pub round_jitter: Duration,
    pub primary_timeout: Duration,
    pub sub_page_timeout: Duration,
    pub user_agent: String,
    pub contact_paths: Vec<String>,
    pub max_target: usize,
    pub title_display_len: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        DiscoveryConfig {
            max_rounds: MAX_ROUNDS,
            batch_multiplier: 8,
            workers: MAX_WORKERS,
            expansion_phrase: "contact email site".to_string(),
            round_pause: Duration::from_secs(1),
            round_jitter: Duration::from_millis(250),
            primary_timeout: Duration::from_secs(8),
            sub_page_timeout: Duration::from_secs(6),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            contact_paths: CONTACT_PATHS.iter().map(|p| p.to_string()).collect(),
            max_target: 20,
            title_display_len: 45,
        }
    }
}

impl DiscoveryConfig {
    /// Same config with rounds and workers held to `1..=MAX_ROUNDS` and `1..=MAX_WORKERS`.
    pub fn bounded(self) -> Self {
        DiscoveryConfig {
            max_rounds: self.max_rounds.clamp(1, MAX_ROUNDS),
            workers: self.workers.clamp(1, MAX_WORKERS),
            ..self
        }
    }

    /// Query sent to the search provider on a given (1-indexed) round.
    pub fn query_for_round(&self, query: &str, round: u32) -> String {
        if round <= 1 {
            query.to_string()
        } else {
            format!("{} {}", query, self.expansion_phrase)
        }
    }

    pub fn volume_for_round(&self, target_count: usize, round: u32) -> usize {
        target_count * self.batch_multiplier * round as usize
    }
}
