//! Terminal and log-file output for the `consbind` binary.
//!
//! The terminal follows `-v`/`--quiet`. A `--log-file` always records at least
//! DEBUG detail, with thread ids and the `structure{name=..}` span of the batch
//! entry being processed, so a quiet run can still be diagnosed afterwards.

use crate::error::{CliError, Result};
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::{Layer, filter::LevelFilter, fmt, prelude::*, registry::LookupSpan};

/// Level shown on stderr for the given `-v` count.
pub fn terminal_level(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::OFF;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Level recorded in the log file: DEBUG, or finer when the terminal asks for it.
pub fn file_level(terminal: LevelFilter) -> LevelFilter {
    terminal.max(LevelFilter::DEBUG)
}

pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let terminal = terminal_level(verbosity, quiet);
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(terminal);

    let file_layer = match log_file {
        Some(path) => Some(file_layer(create_log_file(path)?, file_level(terminal))),
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| {
            CliError::Other(anyhow::anyhow!("Failed to install logger: {}", e))
        })
}

fn create_log_file(path: &Path) -> Result<File> {
    File::create(path).map_err(CliError::Io)
}

fn file_layer<S>(file: File, level: LevelFilter) -> impl Layer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_thread_ids(true)
        .with_target(true)
        .with_filter(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tracing::{debug, info_span, trace};

    #[test]
    fn quiet_silences_the_terminal_but_not_the_file() {
        let terminal = terminal_level(2, true);
        assert_eq!(terminal, LevelFilter::OFF);
        assert_eq!(file_level(terminal), LevelFilter::DEBUG);
    }

    #[test]
    fn each_verbose_flag_lowers_the_terminal_threshold() {
        let levels: Vec<_> = (0..=4).map(|v| terminal_level(v, false)).collect();
        assert_eq!(
            levels,
            vec![
                LevelFilter::WARN,
                LevelFilter::INFO,
                LevelFilter::DEBUG,
                LevelFilter::TRACE,
                LevelFilter::TRACE,
            ]
        );
        assert_eq!(file_level(LevelFilter::TRACE), LevelFilter::TRACE);
    }

    #[test]
    fn log_file_records_the_structure_being_processed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("consbind.log");
        let file = create_log_file(&path).unwrap();
        let subscriber =
            tracing_subscriber::registry().with(file_layer(file, LevelFilter::DEBUG));

        tracing::subscriber::with_default(subscriber, || {
            let _span = info_span!("structure", name = "1abc").entered();
            debug!(pockets = 3, "Workflow finished.");
            trace!("Lattice point rejected.");
        });

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("structure{name=\"1abc\"}"), "{content}");
        assert!(
            content.contains("Workflow finished. pockets=3"),
            "{content}"
        );
        assert!(!content.contains("Lattice point rejected."));
        assert!(!content.contains('\u{1b}'));
    }

    #[test]
    fn unwritable_log_path_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = create_log_file(&dir.path().join("missing").join("consbind.log"));
        assert!(matches!(result, Err(CliError::Io(_))));
    }

    #[test]
    #[serial]
    fn logger_can_only_be_installed_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("consbind.log");
        assert!(setup_logging(0, true, Some(&path)).is_ok());
        assert!(path.is_file());
        assert!(matches!(
            setup_logging(0, true, None),
            Err(CliError::Other(_))
        ));
    }
}
