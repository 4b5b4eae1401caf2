//! Run timing

use std::time::{Duration, Instant};
use tracing::debug;

use crate::models::RunOutcome;

/// Wall-clock timer for one file run
#[derive(Debug)]
pub struct RunTimer {
    started: Instant,
    engine: &'static str,
    target: String,
    attempt: u32,
}

impl RunTimer {
    pub fn start(engine: &'static str, target: impl Into<String>, attempt: u32) -> Self {
        Self {
            started: Instant::now(),
            engine,
            target: target.into(),
            attempt,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Log how the run ended and return its duration
    pub fn finish(self, outcome: Option<&RunOutcome>) -> Duration {
        let elapsed = self.elapsed();
        let ended = match outcome {
            Some(RunOutcome::Ran(record)) if record.is_split() => "split",
            Some(RunOutcome::Ran(record)) if record.failure => "failed",
            Some(RunOutcome::Ran(_)) => "passed",
            Some(RunOutcome::RetryRequested { .. }) => "retry requested",
            None => "errored",
        };
        debug!(
            engine = self.engine,
            attempt = self.attempt,
            elapsed_ms = elapsed.as_millis() as u64,
            "{} {}",
            self.target,
            ended
        );
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResultRecord;
    use std::thread::sleep;

    #[test]
    fn test_run_timer() {
        let timer = RunTimer::start("rspec", "spec/a_spec.rb", 1);
        sleep(Duration::from_millis(10));
        let outcome = RunOutcome::Ran(ResultRecord::ran(1, 0, false));
        assert!(timer.finish(Some(&outcome)) >= Duration::from_millis(10));
    }
}
