use contact_finder_lib::config::{DEFAULT_TARGET_COUNT, MAX_ROUNDS, MAX_WORKERS};
use contact_finder_lib::{logger, export};
use contact_finder_lib::{
    DiscoveryConfig, DiscoveryEvent, DiscoveryLoop, DiscoveryRequest, DomainFilter,
    EmailExtractor, EventSink, HttpPageSource, Outcome, PageFetcher, SearchEngine, SiteScraper,
};

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use log::info;

/// Search the web and collect contact email addresses for the results.
#[derive(Parser, Debug)]
#[command(name = "contact-finder", version)]
struct Args {
    /// Search query, e.g. "digital marketing agency UK"
    #[arg(required = true)]
    query: Vec<String>,

    /// How many contacts to collect
    #[arg(short = 'n', long, default_value_t = DEFAULT_TARGET_COUNT,
          value_parser = clap::value_parser!(u8).range(1..=20))]
    count: u8,

    /// Search rounds before giving up
    #[arg(long, default_value_t = MAX_ROUNDS,
          value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_ROUNDS)))]
    max_rounds: u32,

    /// Concurrent site scrapes
    #[arg(long, default_value_t = MAX_WORKERS as u8,
          value_parser = clap::value_parser!(u8).range(1..=MAX_WORKERS as i64))]
    workers: u8,

    /// Extra domain to skip (repeatable)
    #[arg(long = "exclude", value_name = "DOMAIN")]
    exclude: Vec<String>,

    /// Also write the contacts to this CSV file
    #[arg(short, long, value_name = "CSV")]
    output: Option<PathBuf>,
}

/// Prints progress and result cards to stdout.
struct ConsoleReporter;

impl EventSink for ConsoleReporter {
    fn emit(&mut self, event: DiscoveryEvent) {
        match event {
            DiscoveryEvent::RoundStarted { round, found, target } => {
                println!("Round {} - {}/{} found so far...", round, found, target);
            }
            DiscoveryEvent::SearchFailed { message, .. } => {
                println!("Search error: {}", message);
            }
            DiscoveryEvent::ContactFound { rank, target, display_title, record } => {
                println!("[{}/{}] {}", rank, target, display_title);
                println!("    {}", record.url);
                println!("    {}", record.emails_display());
            }
            DiscoveryEvent::Finished(outcome) => {
                println!("----------------------------------------");
                match outcome {
                    Outcome::NoContacts { .. } => {
                        println!("No contacts found. Try a different query.")
                    }
                    Outcome::Partial { found, target, rounds } => {
                        println!("Only {}/{} contacts found after {} rounds.", found, target, rounds)
                    }
                    Outcome::Complete { found } => println!("All {} contacts found!", found),
                }
            }
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    logger::init();
    let args = Args::parse();
    info!("Starting Contact Finder...");

    let config = DiscoveryConfig {
        max_rounds: args.max_rounds,
        workers: usize::from(args.workers),
        ..DiscoveryConfig::default()
    }
    .bounded();

    let source = HttpPageSource::new(&config.user_agent)?;
    let scraper = SiteScraper::new(
        DomainFilter::with_extra(args.exclude),
        PageFetcher::new(source, &config),
        EmailExtractor::new(),
    );
    let search_engine = SearchEngine::new(&config.user_agent)?;
    let discovery = DiscoveryLoop::new(search_engine, scraper, config);

    let request = DiscoveryRequest::new(args.query.join(" "), usize::from(args.count));
    let session = discovery.run(&request, &mut ConsoleReporter)?;

    if let Some(path) = args.output {
        export::save_csv(&path, &session.found)?;
    }

    info!("Done after {} rounds: {}", session.rounds, session.outcome);
    Ok(())
}
