//! Candidate-facing warning presentation.
//!
//! Presentation is a pure side effect: the detection logic decides what to
//! say, a presenter decides how to show it. The terminal presenter is what
//! the operator harness uses; embedders supply their own.

use std::io::Write;
use std::time::Duration;

/// How long a warning stays on screen before auto-dismissing.
pub const WARNING_DISPLAY_DURATION: Duration = Duration::from_secs(5);

/// Sink for transient candidate-facing alerts.
pub trait WarningPresenter {
    fn warn(&mut self, message: &str);
}

/// Terminal presenter: reverse-video banner plus a best-effort bell.
pub struct TerminalPresenter;

impl WarningPresenter for TerminalPresenter {
    fn warn(&mut self, message: &str) {
        let mut out = std::io::stdout();
        // \x07 is the audio cue; a failed write is not worth surfacing.
        let _ = writeln!(
            out,
            "\x07\x1b[1;7;33m WARNING \x1b[0m {message} (dismisses in {}s)",
            WARNING_DISPLAY_DURATION.as_secs()
        );
        let _ = out.flush();
    }
}

/// Presenter that swallows warnings, for headless embedding.
pub struct SilentPresenter;

impl WarningPresenter for SilentPresenter {
    fn warn(&mut self, _message: &str) {}
}
