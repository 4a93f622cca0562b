pub mod config;
pub mod error;
pub mod logger;
pub mod domain_filter;
pub mod extractor;
pub mod fetcher;
pub mod scraper;
pub mod search_engine;
pub mod pool;
pub mod delay_manager;
pub mod discovery;
pub mod export;

// Exporting types for convenience
pub use config::DiscoveryConfig;
pub use error::{Error, Result};
pub use domain_filter::DomainFilter;
pub use extractor::EmailExtractor;
pub use fetcher::{HttpPageSource, PageFetcher, PageSource};
pub use self::scraper::{Candidate, ContactRecord, Scrape, SiteScraper};
pub use search_engine::{SearchEngine, SearchProvider};
pub use discovery::{DiscoveryEvent, DiscoveryLoop, DiscoveryRequest, EventSink, Outcome, Session};
