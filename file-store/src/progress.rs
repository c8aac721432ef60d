//! Progress reporting for long-running maintenance jobs.
//!
//! `NoopProgress` for the server's background worker, `IndicatifProgress`
//! for the `reindex` command on a terminal.

use indicatif::{ProgressBar, ProgressStyle};

pub trait Progress: Send + Sync {
    /// Set known total steps.
    fn set_total(&self, _n: u64) {}
    /// Advance by one step and show a short message.
    fn step(&self, _msg: &str) {}
    fn finish(&self, _msg: &str) {}
}

#[derive(Default, Clone, Copy)]
pub struct NoopProgress;
impl Progress for NoopProgress {}

pub struct IndicatifProgress {
    pb: ProgressBar,
}

impl IndicatifProgress {
    /// Bounded bar; the length can be set later with [`Progress::set_total`].
    pub fn bar(len: u64) -> Self {
        let pb = ProgressBar::new(len);
        if let Ok(style) =
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>4}/{len:4} {msg}")
        {
            pb.set_style(style);
        }
        Self { pb }
    }
}

impl Progress for IndicatifProgress {
    fn set_total(&self, n: u64) {
        self.pb.set_length(n);
    }
    fn step(&self, msg: &str) {
        self.pb.inc(1);
        self.pb.set_message(msg.to_string());
    }
    fn finish(&self, msg: &str) {
        self.pb.finish_with_message(msg.to_string());
    }
}
