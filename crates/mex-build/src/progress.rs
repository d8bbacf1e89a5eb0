//! Export progress and cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// ============================================================================
// Export Steps
// ============================================================================

/// Stages of an export, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportStep {
    #[default]
    Patching,
    Resolving,
    WritingTables,
    Assembling,
    Done,
}

impl ExportStep {
    /// Get human-readable label for UI.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Patching => "Patching executable",
            Self::Resolving => "Resolving assets",
            Self::WritingTables => "Writing ID tables",
            Self::Assembling => "Assembling image",
            Self::Done => "Done",
        }
    }

    /// Share of the overall percentage this step covers, as `(start, end)`.
    pub const fn span(&self) -> (u8, u8) {
        match self {
            Self::Patching => (0, 5),
            Self::Resolving => (5, 35),
            Self::WritingTables => (35, 40),
            Self::Assembling => (40, 100),
            Self::Done => (100, 100),
        }
    }
}

// ============================================================================
// Progress
// ============================================================================

/// One progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportProgress {
    pub step: ExportStep,
    /// Overall completion, 0 to 100.
    pub percent: u8,
}

impl ExportProgress {
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.step.label()
    }

    /// Returns the progress as a fraction (0.0 to 1.0).
    #[must_use]
    pub fn fraction(&self) -> f32 {
        f32::from(self.percent) / 100.0
    }
}

/// Turns per-step fractions into non-decreasing overall percentages.
pub(crate) struct ProgressReporter<'a> {
    sink: &'a mut dyn FnMut(ExportProgress),
    last: u8,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(sink: &'a mut dyn FnMut(ExportProgress)) -> Self {
        Self { sink, last: 0 }
    }

    /// Reports `done` of `total` units of work within `step`.
    pub(crate) fn report(&mut self, step: ExportStep, done: usize, total: usize) {
        let (start, end) = step.span();
        let width = usize::from(end - start);
        let within = if total == 0 {
            width
        } else {
            width * done.min(total) / total
        };
        let percent = start.saturating_add(u8::try_from(within).unwrap_or(u8::MAX)).min(100);
        let percent = percent.max(self.last);
        self.last = percent;
        (self.sink)(ExportProgress { step, percent });
    }

    pub(crate) fn begin(&mut self, step: ExportStep) {
        self.report(step, 0, 1);
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Shared flag an export polls between assets.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentages_follow_step_spans() {
        let mut seen = Vec::new();
        let mut sink = |p: ExportProgress| seen.push((p.step, p.percent));
        let mut reporter = ProgressReporter::new(&mut sink);
        reporter.begin(ExportStep::Patching);
        reporter.report(ExportStep::Resolving, 1, 2);
        reporter.report(ExportStep::Assembling, 3, 3);
        reporter.begin(ExportStep::Done);
        assert_eq!(
            seen,
            vec![
                (ExportStep::Patching, 0),
                (ExportStep::Resolving, 20),
                (ExportStep::Assembling, 100),
                (ExportStep::Done, 100),
            ]
        );
    }

    #[test]
    fn percentages_never_decrease() {
        let mut seen = Vec::new();
        let mut sink = |p: ExportProgress| seen.push(p.percent);
        let mut reporter = ProgressReporter::new(&mut sink);
        reporter.report(ExportStep::Resolving, 2, 2);
        reporter.report(ExportStep::Resolving, 1, 2);
        assert_eq!(seen, vec![35, 35]);
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let worker = token.clone();
        assert!(!worker.is_cancelled());
        token.cancel();
        assert!(worker.is_cancelled());
    }
}
