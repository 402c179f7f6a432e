use consbind::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const SPINNER_TICK_MS: u64 = 100;

/// What the core reported while one structure was being processed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StructureLog {
    /// Phases that ran to completion, in order.
    pub phases: Vec<&'static str>,
    /// Informational notes, e.g. surface atom counts.
    pub notes: Vec<String>,
    /// Fallbacks and other recoverable problems.
    pub warnings: Vec<String>,
}

#[derive(Default)]
struct State {
    current_phase: Option<&'static str>,
    log: StructureLog,
}

/// Shows pipeline progress for the structure currently being predicted.
///
/// The bar is prefixed with the batch position (`[2/5] 1abc`) so spinner lines of a
/// batch stay attributable. Notes and warnings are printed above the bar and kept in
/// a [`StructureLog`] that the batch driver collects per structure.
#[derive(Clone)]
pub struct CliProgressHandler {
    bar: ProgressBar,
    state: Arc<Mutex<State>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    pub fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(None, target).with_style(spinner_style());
        Self {
            bar,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Resets the per-structure log and labels the bar for the next structure.
    pub fn begin_structure(&self, index: usize, total: usize, name: &str) {
        *self.state() = State::default();
        self.bar.reset();
        self.bar.set_length(0);
        self.bar.set_style(spinner_style());
        self.bar.set_prefix(format!("[{}/{}] {}", index + 1, total, name));
        self.bar.set_message("Reading structure");
    }

    /// Clears the bar and hands back everything reported since `begin_structure`.
    pub fn finish_structure(&self) -> StructureLog {
        self.bar.disable_steady_tick();
        self.bar.finish_and_clear();
        std::mem::take(&mut self.state().log)
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let handler = self.clone();
        Box::new(move |event: Progress| handler.render(event))
    }

    fn render(&self, event: Progress) {
        let mut state = self.state();
        match event {
            Progress::PhaseStart { name } => {
                state.current_phase = Some(name);
                self.bar.set_style(spinner_style());
                self.bar.set_length(0);
                self.bar.set_position(0);
                self.bar.set_message(name);
                self.bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
            }
            Progress::PhaseFinish => {
                self.bar.disable_steady_tick();
                if let Some(name) = state.current_phase.take() {
                    state.log.phases.push(name);
                    self.bar.set_message(format!("{name} done"));
                }
            }
            Progress::TaskStart { total_steps } => {
                self.bar.disable_steady_tick();
                self.bar.set_style(bar_style());
                self.bar.set_length(total_steps);
                self.bar.set_position(0);
            }
            Progress::TaskIncrement => self.bar.inc(1),
            Progress::TaskFinish => {
                if let Some(length) = self.bar.length() {
                    self.bar.set_position(length);
                }
            }
            Progress::Message(note) => {
                self.bar.println(format!("    {note}"));
                state.log.notes.push(note);
            }
            Progress::Warning(warning) => {
                self.bar.println(format!("  ! {warning}"));
                state.log.warnings.push(warning);
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:.bold} {spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:.bold} {msg:<20} [{bar:30.cyan/blue}] {pos}/{len}")
        .map(|style| style.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidden_handler() -> CliProgressHandler {
        CliProgressHandler::with_draw_target(ProgressDrawTarget::hidden())
    }

    #[test]
    fn prefix_names_the_structure_and_its_batch_position() {
        let handler = hidden_handler();
        handler.begin_structure(1, 3, "1abc");
        assert_eq!(handler.bar.prefix(), "[2/3] 1abc");

        let callback = handler.get_callback();
        callback(Progress::PhaseStart {
            name: "Cavity scan",
        });
        assert_eq!(handler.bar.message(), "Cavity scan");
        callback(Progress::PhaseFinish);
        assert_eq!(handler.bar.message(), "Cavity scan done");
    }

    #[test]
    fn completed_phases_are_logged_in_order() {
        let handler = hidden_handler();
        handler.begin_structure(0, 1, "shell");
        let callback = handler.get_callback();
        for name in ["Accessibility", "Cavity scan", "Energy scan"] {
            callback(Progress::PhaseStart { name });
            callback(Progress::PhaseFinish);
        }
        // A phase that never finishes is not reported as completed.
        callback(Progress::PhaseStart { name: "Consensus" });

        let log = handler.finish_structure();
        assert_eq!(
            log.phases,
            vec!["Accessibility", "Cavity scan", "Energy scan"]
        );
        assert!(handler.bar.is_finished());
    }

    #[test]
    fn task_events_drive_the_bar() {
        let handler = hidden_handler();
        handler.begin_structure(0, 1, "shell");
        let callback = handler.get_callback();

        callback(Progress::PhaseStart {
            name: "Energy scan",
        });
        callback(Progress::TaskStart { total_steps: 40 });
        callback(Progress::TaskIncrement);
        callback(Progress::TaskIncrement);
        assert_eq!(handler.bar.length(), Some(40));
        assert_eq!(handler.bar.position(), 2);

        callback(Progress::TaskFinish);
        assert_eq!(handler.bar.position(), 40);

        callback(Progress::PhaseStart { name: "Consensus" });
        assert_eq!(handler.bar.position(), 0);
    }

    #[test]
    fn notes_and_warnings_belong_to_one_structure() {
        let handler = hidden_handler();
        let callback = handler.get_callback();

        handler.begin_structure(0, 2, "first");
        callback(Progress::Message("412 surface atoms".to_string()));
        callback(Progress::Warning(
            "No enclosed cavities found, falling back to concave surface regions".to_string(),
        ));
        let first = handler.finish_structure();
        assert_eq!(first.notes, vec!["412 surface atoms"]);
        assert_eq!(first.warnings.len(), 1);
        assert!(first.warnings[0].contains("concave surface"));

        handler.begin_structure(1, 2, "second");
        callback(Progress::Message("97 surface atoms".to_string()));
        let second = handler.finish_structure();
        assert_eq!(second.notes, vec!["97 surface atoms"]);
        assert!(second.warnings.is_empty());
    }

    #[test]
    fn callback_can_report_from_worker_threads() {
        let handler = hidden_handler();
        handler.begin_structure(0, 1, "shell");
        let callback = handler.get_callback();
        callback(Progress::TaskStart { total_steps: 8 });

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    callback(Progress::TaskIncrement);
                    callback(Progress::TaskIncrement);
                });
            }
        });
        assert_eq!(handler.bar.position(), 8);
    }
}
