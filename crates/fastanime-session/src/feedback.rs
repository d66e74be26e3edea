//! Feedback Service (design §4.9): synchronous progress/spinner/confirm
//! surfaces. Styling is out of scope (spec §4.9 explicitly says so), but
//! the *scoped acquisition token* and *blocks for ack* behaviors are
//! implemented regardless, since those are contract, not cosmetics.
//! Grounded on `indicatif::ProgressBar`, the crate the teacher's sibling
//! binaries use for download progress.

use std::sync::Arc;

use fastanime_core::collaborators::Selector;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

/// Held while a long-running step is in progress; the spinner (if any)
/// stops on every exit path, including early return and panic unwind,
/// because that cleanup lives in `Drop`.
pub struct ProgressToken {
    bar: Option<ProgressBar>,
}

impl Drop for ProgressToken {
    fn drop(&mut self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

pub struct FeedbackService {
    selector: Arc<dyn Selector>,
    quiet: bool,
}

impl FeedbackService {
    pub fn new(selector: Arc<dyn Selector>, quiet: bool) -> Self {
        Self { selector, quiet }
    }

    pub fn success(&self, message: &str) {
        info!(target: "feedback", "{message}");
    }

    pub fn info(&self, message: &str) {
        info!(target: "feedback", "{message}");
    }

    pub fn warning(&self, message: &str) {
        warn!(target: "feedback", "{message}");
    }

    /// Blocks for an acknowledgement before returning, per §4.9.
    pub async fn error(&self, message: &str) {
        error!(target: "feedback", "{message}");
        let _ = self.selector.confirm("Press enter to continue", true).await;
    }

    pub async fn confirm(&self, prompt: &str, default: bool) -> bool {
        self.selector.confirm(prompt, default).await.unwrap_or(default)
    }

    pub async fn ask(&self, prompt: &str, default: Option<&str>) -> Option<String> {
        self.selector.ask(prompt, default).await.unwrap_or_else(|_| default.map(str::to_owned))
    }

    /// Returns a scoped token; while held, a spinner with `message` is
    /// active. Silent (no spinner) when `quiet`.
    pub fn progress(&self, message: &str) -> ProgressToken {
        if self.quiet {
            return ProgressToken { bar: None };
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()));
        bar.set_message(message.to_string());
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        ProgressToken { bar: Some(bar) }
    }

    pub fn clear_console(&self) {
        print!("\x1B[2J\x1B[1;1H");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastanime_core::collaborators::stub::NullSelector;

    #[tokio::test]
    async fn progress_token_stops_spinner_on_drop() {
        let feedback = FeedbackService::new(Arc::new(NullSelector), true);
        let token = feedback.progress("working...");
        drop(token);
        // Quiet mode never created a bar; reaching here without panicking
        // is the assertion.
    }

    #[tokio::test]
    async fn confirm_falls_back_to_default_on_selector_error() {
        let feedback = FeedbackService::new(Arc::new(NullSelector), true);
        assert!(feedback.confirm("continue?", true).await);
    }
}
