//! Progress reporting
//!
//! Each loop emits one liveness signal per item and one summary line at the
//! end. On a terminal that is an `indicatif` spinner; otherwise a `.` per item
//! on stdout, which is what log scrapers and CI output expect.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::{IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

/// Operator-facing progress sink
pub trait Progress: Send + Sync {
    /// One item handled
    fn tick(&self);

    /// Loop finished; print `summary`
    fn finish(&self, summary: &str);
}

/// How progress should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ProgressMode {
    /// Spinner on a terminal, dots otherwise
    #[default]
    Auto,
    Spinner,
    Dots,
    Silent,
}

/// Build a progress sink for `mode`
pub fn progress_for(mode: ProgressMode, label: &str) -> Arc<dyn Progress> {
    let mode = match mode {
        ProgressMode::Auto if std::io::stderr().is_terminal() => ProgressMode::Spinner,
        ProgressMode::Auto => ProgressMode::Dots,
        other => other,
    };

    match mode {
        ProgressMode::Spinner => Arc::new(SpinnerProgress::new(label)),
        ProgressMode::Silent => Arc::new(SilentProgress),
        _ => Arc::new(DotProgress),
    }
}

/// Spinner with a running count
pub struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    pub fn new(label: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} {pos} [{elapsed_precise}]") {
            bar.set_style(style);
        }
        bar.set_message(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }
}

impl Progress for SpinnerProgress {
    fn tick(&self) {
        self.bar.inc(1);
    }

    fn finish(&self, summary: &str) {
        self.bar.finish_and_clear();
        println!("{}", summary);
    }
}

/// One `.` per item on stdout
pub struct DotProgress;

impl Progress for DotProgress {
    fn tick(&self) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(b".");
        let _ = out.flush();
    }

    fn finish(&self, summary: &str) {
        println!("\n{}", summary);
    }
}

/// Reports nothing
pub struct SilentProgress;

impl Progress for SilentProgress {
    fn tick(&self) {}

    fn finish(&self, _summary: &str) {}
}
