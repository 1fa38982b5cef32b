//! Progress events emitted by the dataset stages.
//!
//! Stages never print. Callers hand in a [`ProgressObserver`] and decide
//! where the events go (a terminal bar, the log, or nowhere).

use std::fmt;

/// Dataset stages that run per tune, after files are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Extract,
    Normalize,
    FeatureExtract,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extract => "extract",
            Stage::Normalize => "normalize",
            Stage::FeatureExtract => "feature-extract",
        };
        f.write_str(name)
    }
}

/// One step of progress within a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageProgress {
    pub stage: Stage,
    pub completed: usize,
    pub total: usize,
}

impl StageProgress {
    /// Percentage of the stage completed, in `0.0..=100.0`.
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            return 100.0;
        }
        100.0 * self.completed as f32 / self.total as f32
    }

    pub fn is_done(&self) -> bool {
        self.completed >= self.total
    }
}

pub trait ProgressObserver {
    fn on_progress(&mut self, progress: &StageProgress);
}

impl<F> ProgressObserver for F
where
    F: FnMut(&StageProgress),
{
    fn on_progress(&mut self, progress: &StageProgress) {
        self(progress)
    }
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl ProgressObserver for Silent {
    fn on_progress(&mut self, _progress: &StageProgress) {}
}

/// Forwards events to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_progress(&mut self, progress: &StageProgress) {
        tracing::info!(
            stage = %progress.stage,
            completed = progress.completed,
            total = progress.total,
            "{:.1} %",
            progress.percent()
        );
    }
}
