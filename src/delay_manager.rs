use std::time::Duration;
use std::thread;
use rand::Rng;
use log::debug;

/// Pause between search rounds so the search service is not hammered.
pub fn round_pause(base: Duration, jitter: Duration) -> Duration {
    let delay = base + pick_jitter(jitter);
    if !delay.is_zero() {
        debug!("Waiting for {} ms (Round Delay)...", delay.as_millis());
        thread::sleep(delay);
    }
    delay
}

fn pick_jitter(jitter: Duration) -> Duration {
    let max_ms = jitter.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    let mut rng = rand::thread_rng();
    Duration::from_millis(rng.gen_range(0..=max_ms))
}
