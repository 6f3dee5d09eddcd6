use indicatif::{ProgressBar, ProgressStyle};

use crate::downloader::{DownloadProgress, DownloadSummary};

const TEMPLATE: &str = "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {wide_msg}";

/// Terminal progress bar for the download loop.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> BarProgress {
        BarProgress::with_bar(ProgressBar::new(0))
    }

    fn with_bar(bar: ProgressBar) -> BarProgress {
        if let Ok(style) = ProgressStyle::with_template(TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        BarProgress { bar }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        BarProgress::new()
    }
}

impl DownloadProgress for BarProgress {
    fn on_start(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn on_skip(&self, _filename: &str) {
        self.bar.inc(1);
    }

    fn on_saved(&self, filename: &str) {
        self.bar.set_message(filename.to_string());
        self.bar.inc(1);
    }

    fn on_finish(&self, summary: &DownloadSummary) {
        self.bar.finish_with_message(format!(
            "{downloaded} new files, {skipped} skipped",
            downloaded = summary.downloaded,
            skipped = summary.skipped
        ));
    }
}
