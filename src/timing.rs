//! Build timing utilities.

use std::time::Instant;
use tracing::info;

/// Measures how long one build attempt takes.
pub struct Timer {
    name: String,
    start: Instant,
}

impl Timer {
    /// Start a new timer with the given label.
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
        }
    }

    /// Elapsed time, formatted as seconds or minutes.
    pub fn elapsed(&self) -> String {
        let secs = self.start.elapsed().as_secs_f64();
        if secs >= 60.0 {
            format!("{:.1}m", secs / 60.0)
        } else {
            format!("{:.1}s", secs)
        }
    }

    /// Log the elapsed time.
    pub fn finish(self) {
        info!("[{}] {}", self.elapsed(), self.name);
    }
}
