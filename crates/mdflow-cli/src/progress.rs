use indicatif::{ProgressBar, ProgressStyle};
use mdflow_core::sim::progress::{Progress, ProgressCallback};
use std::time::Duration;

const SPINNER_TICK_MS: u64 = 80;

/// Translates core pipeline progress events into an indicatif spinner/bar.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: ProgressBar,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0)
            .with_style(spinner_style())
            .with_message("Initializing...");
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb.finish_and_clear();

        Self { pb }
    }

    pub fn callback(&self) -> ProgressCallback<'static> {
        let pb = self.pb.clone();

        Box::new(move |progress: Progress| match progress {
            Progress::PhaseStart { phase } => {
                pb.reset();
                pb.set_length(0);
                pb.set_style(spinner_style());
                pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                pb.set_message(phase.name());
            }
            Progress::PhaseFinish => {
                pb.disable_steady_tick();
                pb.finish_with_message("done");
            }
            Progress::StepsStart { total } => {
                pb.disable_steady_tick();
                pb.reset();
                pb.set_length(total);
                pb.set_position(0);
                pb.set_style(bar_style());
            }
            Progress::StepsAdvance { completed } => {
                pb.set_position(completed);
            }
            Progress::StepsFinish => {
                if let Some(length) = pb.length() {
                    pb.set_position(length);
                }
                pb.finish();
            }
            Progress::Message(msg) => {
                if pb.is_finished() {
                    pb.set_message(msg);
                } else {
                    pb.println(format!("  {}", msg));
                }
            }
        })
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .expect("spinner style template is valid")
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg:<12} [{bar:40.cyan/blue}] {pos}/{len} steps ({eta})")
        .expect("bar style template is valid")
        .progress_chars("##-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdflow_core::sim::pipeline::PipelinePhase;

    #[test]
    fn handler_starts_in_a_clean_state() {
        let handler = CliProgressHandler::new();
        assert!(handler.pb.is_finished());
        assert_eq!(handler.pb.length(), Some(0));
    }

    #[test]
    fn step_events_drive_the_bar_position() {
        let handler = CliProgressHandler::new();
        let callback = handler.callback();

        callback(Progress::PhaseStart {
            phase: PipelinePhase::Produce,
        });
        callback(Progress::StepsStart { total: 100 });
        callback(Progress::StepsAdvance { completed: 40 });
        assert_eq!(handler.pb.position(), 40);
        assert_eq!(handler.pb.length(), Some(100));

        callback(Progress::StepsFinish);
        assert!(handler.pb.is_finished());
        assert_eq!(handler.pb.position(), 100);
    }
}
