use log::{debug, warn};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::error::Result;
use crate::scraper::{Candidate, ContactRecord, Scrape};

struct Job {
    round: u32,
    candidate: Candidate,
}

/// Result of one scrape, delivered in completion order.
#[derive(Debug)]
pub struct Completion {
    pub round: u32,
    pub url: String,
    pub record: Option<ContactRecord>,
}

/// Fixed set of scrape workers. The owner is the only reader of completions,
/// so workers never touch session state.
pub struct WorkerPool {
    jobs: Sender<Job>,
    completions: Receiver<Completion>,
    cancelled_through: Arc<AtomicU32>,
}

impl WorkerPool {
    pub fn new<S: Scrape + 'static>(size: usize, scraper: Arc<S>) -> Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (done_tx, done_rx) = mpsc::channel::<Completion>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let cancelled_through = Arc::new(AtomicU32::new(0));

        for id in 0..size.max(1) {
            let job_rx = Arc::clone(&job_rx);
            let done_tx = done_tx.clone();
            let scraper = Arc::clone(&scraper);
            let cancelled = Arc::clone(&cancelled_through);

            thread::Builder::new()
                .name(format!("scrape-worker-{}", id))
                .spawn(move || worker_loop(job_rx, done_tx, scraper, cancelled))?;
        }

        Ok(WorkerPool {
            jobs: job_tx,
            completions: done_rx,
            cancelled_through,
        })
    }

    /// Returns false once every worker is gone.
    pub fn submit(&self, round: u32, candidate: Candidate) -> bool {
        self.jobs.send(Job { round, candidate }).is_ok()
    }

    /// Blocks for the next finished job. `None` means no worker is left to produce one.
    pub fn next_completion(&self) -> Option<Completion> {
        self.completions.recv().ok()
    }

    /// Jobs of `round` and earlier that have not started are dropped. Running ones finish.
    pub fn cancel_through(&self, round: u32) {
        self.cancelled_through.fetch_max(round, Ordering::SeqCst);
    }
}

fn worker_loop<S: Scrape>(
    jobs: Arc<Mutex<Receiver<Job>>>,
    done: Sender<Completion>,
    scraper: Arc<S>,
    cancelled_through: Arc<AtomicU32>,
) {
    loop {
        let next = {
            let guard = match jobs.lock() {
                Ok(guard) => guard,
                Err(_) => {
                    warn!("Job queue poisoned, worker exiting");
                    return;
                }
            };
            guard.recv()
        };
        // Sender dropped: the session is over.
        let Ok(job) = next else {
            return;
        };

        if job.round <= cancelled_through.load(Ordering::SeqCst) {
            debug!("Dropping cancelled job for {}", job.candidate.url);
            continue;
        }

        let record = scraper.scrape(&job.candidate);
        let completion = Completion {
            round: job.round,
            url: job.candidate.url,
            record,
        };
        if done.send(completion).is_err() {
            return;
        }
    }
}
