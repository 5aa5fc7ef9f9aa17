// Terminal stand-in for the grid display.

use picker_kernel::gallery::{GalleryView, Notice};
use picker_kernel::record::ImageRecord;
use tracing::debug;

/// Logs incremental updates and prints notices to stderr.
#[derive(Debug, Default)]
pub struct TerminalView {
    shown: usize,
}

impl TerminalView {
    /// Number of cells currently displayed.
    pub fn shown(&self) -> usize {
        self.shown
    }
}

impl GalleryView for TerminalView {
    fn reload(&mut self, records: &[ImageRecord]) {
        self.shown = records.len();
        debug!(count = self.shown, "grid reloaded");
    }

    fn insert_at(&mut self, index: usize, record: &ImageRecord) {
        self.shown += 1;
        debug!(index, id = %record.id(), "cell inserted");
    }

    fn replace_at(&mut self, index: usize, record: &ImageRecord) {
        debug!(index, id = %record.id(), "cell replaced");
    }

    fn remove_at(&mut self, index: usize) {
        self.shown = self.shown.saturating_sub(1);
        debug!(index, "cell removed");
    }

    fn present_actions(&mut self, record: &ImageRecord) {
        eprintln!("actions for {}", record.id());
    }

    fn show_notice(&mut self, notice: &Notice) {
        eprintln!("warning: {notice}");
    }
}
