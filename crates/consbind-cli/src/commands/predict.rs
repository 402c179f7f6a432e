use crate::cli::PredictArgs;
use crate::config::{AppConfig, build_config};
use crate::error::{CliError, Result};
use crate::utils::files::{collect_structures, structure_stem};
use crate::utils::progress::CliProgressHandler;
use consbind::{
    core::io::{
        pdb::PdbFile,
        report::{PocketReport, ReportWriter},
        traits::MolecularFile,
    },
    engine::{
        accessibility::{AccessibilityService, NoAccessibility},
        progress::ProgressReporter,
    },
    workflows,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, info_span, warn};

/// What a successful structure run produced.
#[derive(Debug)]
pub struct StructureOutcome {
    pub name: String,
    pub pockets: usize,
    pub output_dir: PathBuf,
    pub files: Vec<PathBuf>,
    /// Fallbacks the pipeline reported for this structure.
    pub warnings: Vec<String>,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<StructureOutcome>,
    pub failed: Vec<(PathBuf, String)>,
    /// Structures never started because the time limit was reached.
    pub skipped: Vec<PathBuf>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.skipped.len()
    }
}

pub fn run(args: PredictArgs) -> Result<()> {
    info!("Merging defaults, config file and CLI arguments...");
    let config = build_config(&args)?;
    let progress_handler = CliProgressHandler::new();

    let summary = run_batch(&config, &progress_handler)?;
    print_summary(&summary);

    if summary.succeeded.is_empty() {
        return Err(CliError::Other(anyhow::anyhow!(
            "No structure was processed successfully ({} failed, {} skipped)",
            summary.failed.len(),
            summary.skipped.len()
        )));
    }
    Ok(())
}

/// Processes every input structure in order. Failures are recorded per structure and
/// never abort the batch; the time limit is only checked before starting a structure.
pub fn run_batch(
    config: &AppConfig,
    progress_handler: &CliProgressHandler,
) -> Result<BatchSummary> {
    let inputs = collect_structures(&config.input_path)?;
    info!(count = inputs.len(), "Collected input structures.");

    let start = Instant::now();
    let mut summary = BatchSummary::default();

    for (i, path) in inputs.iter().enumerate() {
        let out_of_time = config.time_limit.is_some_and(|t| start.elapsed() >= t);
        if i > 0 && out_of_time {
            warn!(
                remaining = inputs.len() - i,
                "Time limit reached, skipping remaining structures."
            );
            println!(
                "Time limit reached, skipping {} remaining structure(s).",
                inputs.len() - i
            );
            summary.skipped.extend(inputs[i..].iter().cloned());
            break;
        }

        let name = structure_stem(path);
        let _span = info_span!("structure", name = %name).entered();
        println!(
            "[{}/{}] Predicting binding sites for {}",
            i + 1,
            inputs.len(),
            path.display()
        );
        progress_handler.begin_structure(i, inputs.len(), &name);
        let outcome = predict_structure(path, &name, config, progress_handler);
        let log = progress_handler.finish_structure();

        match outcome {
            Ok(mut outcome) => {
                println!(
                    "✓ {} binding site(s) predicted for {}, {} file(s) written to {}",
                    outcome.pockets,
                    outcome.name,
                    outcome.files.len(),
                    outcome.output_dir.display()
                );
                outcome.warnings = log.warnings;
                summary.succeeded.push(outcome);
            }
            Err(e) => {
                error!(path = ?path, error = %e, "Structure failed.");
                eprintln!("✗ {}: {}", path.display(), e);
                summary.failed.push((path.clone(), e.to_string()));
            }
        }
    }

    Ok(summary)
}

fn predict_structure(
    path: &Path,
    name: &str,
    config: &AppConfig,
    progress_handler: &CliProgressHandler,
) -> Result<StructureOutcome> {
    info!("Loading input structure from {:?}", path);
    let (structure, metadata) =
        PdbFile::read_from_path(path).map_err(|source| CliError::Structure {
            path: path.to_path_buf(),
            source,
        })?;

    let service: &dyn AccessibilityService = match &config.accessibility {
        Some(shrake_rupley) => shrake_rupley,
        None => &NoAccessibility,
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Invoking the core prediction workflow...");
    let result = workflows::predict::run(&structure, &config.prediction, service, &reporter)?;
    info!(
        pockets = result.pockets.len(),
        geometric = result.geometric_count,
        energy = result.energy_count,
        filter = ?result.filter_path,
        "Workflow finished."
    );
    if result.is_empty() {
        warn!("Workflow completed but found no binding sites.");
    }

    let output_dir = config.output_dir.join(name);
    let report = PocketReport::new(&structure, &result.pockets);
    let files = ReportWriter::new(&output_dir, name)
        .write(&report, &metadata, config.report)
        .map_err(|source| CliError::Report {
            path: output_dir.clone(),
            source,
        })?;
    for file in &files {
        info!("Wrote {:?}", file);
    }

    Ok(StructureOutcome {
        name: name.to_string(),
        pockets: result.pockets.len(),
        output_dir,
        files,
        warnings: Vec::new(),
    })
}

fn print_summary(summary: &BatchSummary) {
    if summary.total() <= 1 && summary.failed.is_empty() {
        return;
    }
    println!();
    println!(
        "Batch finished: {}/{} structure(s) succeeded, {} failed, {} skipped.",
        summary.succeeded.len(),
        summary.total(),
        summary.failed.len(),
        summary.skipped.len()
    );
    for outcome in &summary.succeeded {
        match outcome.warnings.len() {
            0 => println!("  ✓ {:<20} {} site(s)", outcome.name, outcome.pockets),
            n => println!(
                "  ✓ {:<20} {} site(s), {} warning(s)",
                outcome.name, outcome.pockets, n
            ),
        }
    }
    for (path, message) in &summary.failed {
        println!("  ✗ {:<20} {}", structure_stem(path), message);
    }
}
