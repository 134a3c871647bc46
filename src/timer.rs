// timer.rs

use std::time::{Duration, Instant};

/// Logs the time spent in a scope when dropped.
pub struct Timer {
    label: String,
    begin: Instant,
}

impl Timer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            begin: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.begin.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        log::info!(
            "Time elapsed for {}: {}ms",
            self.label,
            self.begin.elapsed().as_millis()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_monotonic() {
        let timer = Timer::new("sleep");
        std::thread::sleep(Duration::from_millis(5));
        let first = timer.elapsed();
        assert!(first >= Duration::from_millis(5));
        assert!(timer.elapsed() >= first);
    }
}
