use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use reelgrab_engine::{ProgressCallback, ProgressEvent};

/// Stages of a video download; saving the chat adds one more.
pub const VIDEO_STAGES: usize = 5;

const SEGMENT_TEMPLATE: &str = "{bar:40.cyan/blue} {pos}/{len} ({msg})";
const BYTES_TEMPLATE: &str = "{bar:40.cyan/blue} {bytes}/{total_bytes} ({msg}) {bytes_per_sec}";

/// Prints the numbered stage headers and drives the download progress bar.
pub struct Reporter {
    bar: ProgressBar,
    quiet: bool,
    stages: usize,
}

impl Reporter {
    pub fn new(quiet: bool, stages: usize) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::no_length()
        };
        Self { bar, quiet, stages }
    }

    pub fn stage(&self, step: usize, title: &str) {
        if !self.quiet {
            println!("\n[{step}/{}] {title}", self.stages);
        }
    }

    pub fn detail(&self, line: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", line.as_ref());
        }
    }

    /// Callback handed to the engine; renders every event on the shared bar.
    pub fn callback(&self) -> ProgressCallback {
        let bar = self.bar.clone();
        Arc::new(move |event: ProgressEvent| render(&bar, &event))
    }

    pub fn finish(&self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}

fn render(bar: &ProgressBar, event: &ProgressEvent) {
    match event {
        ProgressEvent::SegmentsStarted { total } => {
            bar.set_style(style(SEGMENT_TEMPLATE));
            bar.set_length(*total as u64);
            bar.set_position(0);
            bar.set_message(format!("{:.1}%", 0.0));
        }
        ProgressEvent::SegmentCompleted { completed, .. } => {
            bar.set_position(*completed as u64);
            if let Some(percentage) = event.percentage() {
                bar.set_message(format!("{percentage:.1}%"));
            }
        }
        ProgressEvent::BytesReceived {
            downloaded,
            total: Some(total),
        } => {
            if bar.length() != Some(*total) {
                bar.set_style(style(BYTES_TEMPLATE));
                bar.set_length(*total);
            }
            bar.set_position(*downloaded);
            if let Some(percentage) = event.percentage() {
                bar.set_message(format!("{percentage:.1}%"));
            }
        }
        ProgressEvent::BytesReceived { total: None, .. } => {}
        ProgressEvent::Finished { .. } => bar.finish(),
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}
