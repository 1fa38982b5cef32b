use indicatif::{ProgressBar, ProgressStyle};
use tunes_core::progress::{ProgressObserver, Stage, StageProgress};

/// Terminal progress bar, one bar per stage.
pub struct BarProgress {
    style: ProgressStyle,
    bar: Option<(Stage, ProgressBar)>,
}

impl BarProgress {
    pub fn new() -> anyhow::Result<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.green} {msg:>16} [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
        )?
        .progress_chars("#>-");
        Ok(Self { style, bar: None })
    }

    fn bar_for(&mut self, progress: &StageProgress) -> &ProgressBar {
        let stale = matches!(&self.bar, Some((stage, bar)) if *stage != progress.stage || bar.is_finished());
        if stale {
            if let Some((_, old)) = self.bar.take() {
                old.finish_and_clear();
            }
        }
        let (_, bar) = self.bar.get_or_insert_with(|| {
            let bar = ProgressBar::new(progress.total as u64);
            bar.set_style(self.style.clone());
            bar.set_message(progress.stage.to_string());
            (progress.stage, bar)
        });
        bar
    }
}

impl ProgressObserver for BarProgress {
    fn on_progress(&mut self, progress: &StageProgress) {
        let bar = self.bar_for(progress);
        bar.set_position(progress.completed as u64);
        if progress.is_done() {
            bar.finish();
        }
    }
}

impl Drop for BarProgress {
    fn drop(&mut self) {
        if let Some((_, bar)) = self.bar.take() {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    }
}
