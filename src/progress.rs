// src/progress.rs

use indicatif::ProgressBar;

/// Receiver of coarse progress from the analyzer.
pub trait ProgressSink {
    /// Completion in percent, 0 to 100.
    fn update_progress(&self, percent: u64);

    /// Names the phase that just started.
    fn send_message(&self, message: &str);
}

impl ProgressSink for ProgressBar {
    fn update_progress(&self, percent: u64) {
        self.set_position(percent);
    }

    fn send_message(&self, message: &str) {
        self.set_message(message.to_string());
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update_progress(&self, _percent: u64) {}

    fn send_message(&self, _message: &str) {}
}
