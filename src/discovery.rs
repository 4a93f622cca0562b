use log::{info, warn};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::config::DiscoveryConfig;
use crate::delay_manager;
use crate::error::{Error, Result};
use crate::pool::WorkerPool;
use crate::scraper::{Candidate, ContactRecord, Scrape};
use crate::search_engine::SearchProvider;

#[derive(Debug, Clone)]
pub struct DiscoveryRequest {
    pub query: String,
    pub target_count: usize,
}

impl DiscoveryRequest {
    pub fn new(query: impl Into<String>, target_count: usize) -> Self {
        DiscoveryRequest {
            query: query.into(),
            target_count,
        }
    }

    fn validate(&self, max_target: usize) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(Error::InvalidRequest("query must not be empty".to_string()));
        }
        if self.target_count == 0 || self.target_count > max_target {
            return Err(Error::InvalidRequest(format!(
                "target count must be between 1 and {}, got {}",
                max_target, self.target_count
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NoContacts { rounds: u32 },
    Partial { found: usize, target: usize, rounds: u32 },
    Complete { found: usize },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::NoContacts { .. } => write!(f, "no contacts found"),
            Outcome::Partial { found, target, rounds } => {
                write!(f, "partial: {}/{} found after {} rounds", found, target, rounds)
            }
            Outcome::Complete { found } => write!(f, "all {} found", found),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    RoundStarted { round: u32, found: usize, target: usize },
    /// Search errors cost the round its candidates but never end the session.
    SearchFailed { round: u32, message: String },
    ContactFound {
        rank: usize,
        target: usize,
        display_title: String,
        record: ContactRecord,
    },
    Finished(Outcome),
}

/// Consumer of discovery progress: the console in the binary, a `Vec` in tests.
pub trait EventSink {
    fn emit(&mut self, event: DiscoveryEvent);
}

impl EventSink for Vec<DiscoveryEvent> {
    fn emit(&mut self, event: DiscoveryEvent) {
        self.push(event);
    }
}

/// What one search invocation produced.
#[derive(Debug, Clone)]
pub struct Session {
    pub query: String,
    pub target_count: usize,
    pub rounds: u32,
    pub found: Vec<ContactRecord>,
    pub outcome: Outcome,
}

pub struct DiscoveryLoop<P, S> {
    provider: P,
    scraper: Arc<S>,
    config: DiscoveryConfig,
}

impl<P: SearchProvider, S: Scrape + 'static> DiscoveryLoop<P, S> {
    pub fn new(provider: P, scraper: S, config: DiscoveryConfig) -> Self {
        DiscoveryLoop {
            provider,
            scraper: Arc::new(scraper),
            config: config.bounded(),
        }
    }

    pub fn run(&self, request: &DiscoveryRequest, sink: &mut dyn EventSink) -> Result<Session> {
        request.validate(self.config.max_target)?;
        let target = request.target_count;
        let query = request.query.trim();

        let pool = WorkerPool::new(self.config.workers, Arc::clone(&self.scraper))?;
        let mut found: Vec<ContactRecord> = Vec::new();
        let mut found_urls: HashSet<String> = HashSet::new();
        // Every URL ever handed to a worker; a URL is fetched once per session.
        let mut dispatched: HashSet<String> = HashSet::new();
        let mut round = 0;

        while found.len() < target && round < self.config.max_rounds {
            round += 1;
            if round > 1 {
                delay_manager::round_pause(self.config.round_pause, self.config.round_jitter);
            }

            info!("Round {} - {}/{} found so far", round, found.len(), target);
            sink.emit(DiscoveryEvent::RoundStarted {
                round,
                found: found.len(),
                target,
            });

            let round_query = self.config.query_for_round(query, round);
            let volume = self.config.volume_for_round(target, round);
            let candidates = match self.provider.search(&round_query, volume) {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!("Search error in round {}: {}", round, e);
                    sink.emit(DiscoveryEvent::SearchFailed {
                        round,
                        message: e.to_string(),
                    });
                    Vec::new()
                }
            };

            let fresh: Vec<Candidate> = candidates
                .into_iter()
                .filter(|c| !found_urls.contains(&c.url))
                .filter(|c| dispatched.insert(c.url.clone()))
                .collect();
            info!("Dispatching {} fresh candidates", fresh.len());

            let mut pending = 0;
            for candidate in fresh {
                if !pool.submit(round, candidate) {
                    warn!("Worker pool is gone, abandoning round {}", round);
                    break;
                }
                pending += 1;
            }

            while pending > 0 && found.len() < target {
                let Some(completion) = pool.next_completion() else {
                    warn!("Worker pool stopped with {} jobs outstanding", pending);
                    break;
                };
                pending -= 1;

                let Some(record) = completion.record else {
                    continue;
                };
                if !found_urls.insert(record.url.clone()) {
                    continue;
                }

                found.push(record.clone());
                info!("[{}/{}] {} -> {}", found.len(), target, record.url, record.emails_display());
                sink.emit(DiscoveryEvent::ContactFound {
                    rank: found.len(),
                    target,
                    display_title: truncate_title(&record.title, self.config.title_display_len),
                    record,
                });
            }

            if found.len() >= target {
                // In-flight scrapes run to completion; their results are surplus.
                pool.cancel_through(round);
            }
        }

        let outcome = if found.is_empty() {
            Outcome::NoContacts { rounds: round }
        } else if found.len() < target {
            Outcome::Partial {
                found: found.len(),
                target,
                rounds: round,
            }
        } else {
            Outcome::Complete { found: found.len() }
        };
        info!("Discovery finished: {}", outcome);
        sink.emit(DiscoveryEvent::Finished(outcome.clone()));

        Ok(Session {
            query: query.to_string(),
            target_count: target,
            rounds: round,
            found,
            outcome,
        })
    }
}

pub fn truncate_title(title: &str, max_chars: usize) -> String {
    title.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_filter::DomainFilter;
    use crate::extractor::EmailExtractor;
    use crate::fetcher::tests::FakeWeb;
    use crate::fetcher::PageFetcher;
    use crate::scraper::SiteScraper;
    use std::cell::RefCell;
    use std::time::Duration;

    /// Replays one scripted answer per round; rounds past the script get the last one.
    struct ScriptedSearch {
        rounds: Vec<Result<Vec<Candidate>>>,
        calls: RefCell<Vec<(String, usize)>>,
    }

    impl ScriptedSearch {
        fn new(rounds: Vec<Result<Vec<Candidate>>>) -> Self {
            ScriptedSearch {
                rounds,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl SearchProvider for ScriptedSearch {
        fn search(&self, query: &str, max_results: usize) -> Result<Vec<Candidate>> {
            let idx = self.calls.borrow().len().min(self.rounds.len() - 1);
            self.calls.borrow_mut().push((query.to_string(), max_results));
            match &self.rounds[idx] {
                Ok(candidates) => Ok(candidates.iter().take(max_results).cloned().collect()),
                Err(e) => Err(Error::Search(e.to_string())),
            }
        }
    }

    fn quick_config() -> DiscoveryConfig {
        DiscoveryConfig {
            round_pause: Duration::ZERO,
            round_jitter: Duration::ZERO,
            ..DiscoveryConfig::default()
        }
    }

    fn site_scraper(web: Arc<FakeWeb>) -> SiteScraper<Arc<FakeWeb>> {
        SiteScraper::new(
            DomainFilter::default(),
            PageFetcher::new(web, &quick_config()),
            EmailExtractor::new(),
        )
    }

    fn finished(events: &[DiscoveryEvent]) -> Vec<&Outcome> {
        events
            .iter()
            .filter_map(|e| match e {
                DiscoveryEvent::Finished(outcome) => Some(outcome),
                _ => None,
            })
            .collect()
    }

    fn rounds_started(events: &[DiscoveryEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, DiscoveryEvent::RoundStarted { .. }))
            .count()
    }

    #[test]
    fn test_two_good_candidates_finish_in_one_round() {
        let web = Arc::new(
            FakeWeb::default()
                .page("https://alpha-widgets.com", "<p>sales@alpha-widgets.com</p>")
                .page("https://beta-widgets.com", "<p>hello@beta-widgets.com</p>"),
        );
        let search = ScriptedSearch::new(vec![Ok(vec![
            Candidate::new("Alpha Widgets", "https://alpha-widgets.com"),
            Candidate::new("Beta Widgets", "https://beta-widgets.com"),
        ])]);
        let discovery = DiscoveryLoop::new(search, site_scraper(web), quick_config());

        let mut events: Vec<DiscoveryEvent> = Vec::new();
        let session = discovery
            .run(&DiscoveryRequest::new("widget makers", 2), &mut events)
            .unwrap();

        assert_eq!(session.rounds, 1);
        assert_eq!(session.found.len(), 2);
        assert_eq!(session.outcome, Outcome::Complete { found: 2 });
        assert_eq!(finished(&events), vec![&Outcome::Complete { found: 2 }]);
        assert_eq!(rounds_started(&events), 1);

        let ranks: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                DiscoveryEvent::ContactFound { rank, target, .. } => {
                    assert_eq!(*target, 2);
                    Some(*rank)
                }
                _ => None,
            })
            .collect();
        assert_eq!(ranks, vec![1, 2]);
        assert_eq!(discovery.provider.calls.borrow()[0], ("widget makers".to_string(), 16));
    }

    #[test]
    fn test_only_excluded_sites_fail_after_five_rounds() {
        let web = Arc::new(FakeWeb::default());
        let search = ScriptedSearch::new(vec![Ok(vec![
            Candidate::new("Wiki", "https://en.wikipedia.org/wiki/Widget"),
            Candidate::new("Tube", "https://www.youtube.com/watch?v=1"),
            Candidate::new("Shop", "https://www.amazon.com/widgets"),
        ])]);
        let discovery = DiscoveryLoop::new(search, site_scraper(web.clone()), quick_config());

        let mut events: Vec<DiscoveryEvent> = Vec::new();
        let session = discovery
            .run(&DiscoveryRequest::new("widget makers", 3), &mut events)
            .unwrap();

        assert!(session.found.is_empty());
        assert_eq!(session.rounds, 5);
        assert_eq!(session.outcome, Outcome::NoContacts { rounds: 5 });
        assert_eq!(rounds_started(&events), 5);
        assert_eq!(finished(&events), vec![&Outcome::NoContacts { rounds: 5 }]);
        assert!(web.requested().is_empty());

        let calls = discovery.provider.calls.borrow();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[1], ("widget makers contact email site".to_string(), 48));
        assert_eq!(calls[4].1, 120);
    }

    #[test]
    fn test_round_budget_cannot_exceed_five() {
        let search = ScriptedSearch::new(vec![Ok(Vec::new())]);
        let config = DiscoveryConfig {
            max_rounds: 6,
            ..quick_config()
        };
        let discovery =
            DiscoveryLoop::new(search, site_scraper(Arc::new(FakeWeb::default())), config);

        let mut events: Vec<DiscoveryEvent> = Vec::new();
        let session = discovery
            .run(&DiscoveryRequest::new("widget makers", 1), &mut events)
            .unwrap();

        assert_eq!(session.rounds, 5);
        assert_eq!(rounds_started(&events), 5);
        assert_eq!(discovery.provider.calls.borrow().len(), 5);
    }

    #[test]
    fn test_repeated_candidate_is_scraped_once() {
        let web = Arc::new(
            FakeWeb::default()
                .page("https://alpha-widgets.com", "<p>sales@alpha-widgets.com</p>")
                .page("https://beta-widgets.com", "<p>hello@beta-widgets.com</p>"),
        );
        let search = ScriptedSearch::new(vec![
            Ok(vec![Candidate::new("Alpha", "https://alpha-widgets.com")]),
            Ok(vec![
                Candidate::new("Alpha again", "https://alpha-widgets.com"),
                Candidate::new("Beta", "https://beta-widgets.com"),
            ]),
        ]);
        let discovery = DiscoveryLoop::new(search, site_scraper(web.clone()), quick_config());

        let mut events: Vec<DiscoveryEvent> = Vec::new();
        let session = discovery
            .run(&DiscoveryRequest::new("widget makers", 2), &mut events)
            .unwrap();

        assert_eq!(session.rounds, 2);
        assert_eq!(session.found.len(), 2);
        let alpha_hits = web
            .requested()
            .iter()
            .filter(|u| u.as_str() == "https://alpha-widgets.com")
            .count();
        assert_eq!(alpha_hits, 1);
    }

    #[test]
    fn test_search_errors_do_not_end_the_session() {
        let web = Arc::new(
            FakeWeb::default().page("https://gamma.io", "<p>team@gamma.io</p>"),
        );
        let search = ScriptedSearch::new(vec![
            Err(Error::Search("rate limited".to_string())),
            Ok(vec![Candidate::new("Gamma", "https://gamma.io")]),
        ]);
        let discovery = DiscoveryLoop::new(search, site_scraper(web), quick_config());

        let mut events: Vec<DiscoveryEvent> = Vec::new();
        let session = discovery
            .run(&DiscoveryRequest::new("widget makers", 2), &mut events)
            .unwrap();

        assert!(events.iter().any(|e| matches!(e, DiscoveryEvent::SearchFailed { round: 1, .. })));
        assert_eq!(session.found.len(), 1);
        assert_eq!(
            session.outcome,
            Outcome::Partial { found: 1, target: 2, rounds: 5 }
        );
        assert_eq!(session.outcome.to_string(), "partial: 1/2 found after 5 rounds");
    }

    #[test]
    fn test_never_records_more_than_target() {
        let mut web = FakeWeb::default();
        let mut candidates = Vec::new();
        for i in 0..12 {
            let url = format!("https://shop{}.com", i);
            web = web.page(&url, &format!("<p>owner@shop{}.com</p>", i));
            candidates.push(Candidate::new(format!("Shop {}", i), url));
        }
        let search = ScriptedSearch::new(vec![Ok(candidates)]);
        let discovery = DiscoveryLoop::new(search, site_scraper(Arc::new(web)), quick_config());

        let mut events: Vec<DiscoveryEvent> = Vec::new();
        let session = discovery
            .run(&DiscoveryRequest::new("widget makers", 3), &mut events)
            .unwrap();

        assert_eq!(session.found.len(), 3);
        assert_eq!(session.rounds, 1);
        let found_events = events
            .iter()
            .filter(|e| matches!(e, DiscoveryEvent::ContactFound { .. }))
            .count();
        assert_eq!(found_events, 3);
        let unique: HashSet<&str> = session.found.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_rejects_bad_requests() {
        let search = ScriptedSearch::new(vec![Ok(Vec::new())]);
        let discovery =
            DiscoveryLoop::new(search, site_scraper(Arc::new(FakeWeb::default())), quick_config());
        let mut events: Vec<DiscoveryEvent> = Vec::new();

        assert!(matches!(
            discovery.run(&DiscoveryRequest::new("   ", 4), &mut events),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            discovery.run(&DiscoveryRequest::new("widgets", 0), &mut events),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            discovery.run(&DiscoveryRequest::new("widgets", 21), &mut events),
            Err(Error::InvalidRequest(_))
        ));
        assert!(events.is_empty());
    }

    #[test]
    fn test_outcome_messages() {
        assert_eq!(Outcome::NoContacts { rounds: 5 }.to_string(), "no contacts found");
        assert_eq!(
            Outcome::Partial { found: 2, target: 4, rounds: 5 }.to_string(),
            "partial: 2/4 found after 5 rounds"
        );
        assert_eq!(Outcome::Complete { found: 4 }.to_string(), "all 4 found");
    }

    #[test]
    fn test_titles_truncate_on_char_boundaries() {
        assert_eq!(truncate_title("Ünïcödé Widgets", 3), "Ünï");
        assert_eq!(truncate_title("Short", 45), "Short");
    }
}
