use crate::core::models::pocket::Pocket;
use crate::core::models::structure::Structure;
use crate::engine::accessibility::{Accessibility, AccessibilityService};
use crate::engine::config::PredictionConfig;
use crate::engine::context::ScanContext;
use crate::engine::error::EngineError;
use crate::engine::progress::ProgressReporter;
use crate::engine::surface::SurfaceSource;
use crate::engine::tasks::cavity_scan::{self, CavityTier};
use crate::engine::tasks::significance::{self, FilterPath};
use crate::engine::tasks::{consensus, energy_scan, scoring};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, instrument};

const NEIGHBOUR_COUNT_FALLBACK: &str = "surface atoms approximated from neighbour counts";

#[derive(Debug, Clone)]
pub struct PredictionResult {
    /// Significant pockets, best first.
    pub pockets: Vec<Pocket>,
    pub geometric_count: usize,
    pub energy_count: usize,
    /// Pockets left after consensus merging, before the significance filter.
    pub merged_count: usize,
    pub cavity_tier: Option<CavityTier>,
    pub surface_source: SurfaceSource,
    pub filter_path: FilterPath,
}

impl PredictionResult {
    pub fn is_empty(&self) -> bool {
        self.pockets.is_empty()
    }
}

/// Predicts the significant binding pockets of `structure`.
///
/// The run is deterministic when `config.seed` is set. Accessibility failures and empty
/// scanner results are not errors; they show up in the returned fallback markers.
#[instrument(skip_all, name = "prediction_workflow", fields(structure = structure.name()))]
pub fn run(
    structure: &Structure,
    config: &PredictionConfig,
    accessibility_service: &dyn AccessibilityService,
    reporter: &ProgressReporter,
) -> Result<PredictionResult, EngineError> {
    config.validate()?;
    info!(
        atoms = structure.atom_count(),
        "Starting binding site prediction."
    );

    // === Phase 0: Accessibility ===
    let accessibility = {
        let _phase = reporter.phase("Accessibility");
        let accessibility = Accessibility::evaluate(accessibility_service, structure);
        match &accessibility {
            Accessibility::Computed(_) => {}
            Accessibility::Unavailable => reporter.warn(format!(
                "Solvent accessibility unavailable, {NEIGHBOUR_COUNT_FALLBACK}"
            )),
            Accessibility::Failed(e) => reporter.warn(format!(
                "Solvent accessibility failed ({e}), {NEIGHBOUR_COUNT_FALLBACK}"
            )),
        }
        accessibility
    };
    let surface_source = if accessibility.exposure().is_some() {
        SurfaceSource::Accessibility
    } else {
        SurfaceSource::NeighbourCount
    };

    let context = ScanContext::new(structure, config, reporter, &accessibility);
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    // === Phase 1: Geometric cavities ===
    let cavity_scan::CavityScan {
        pockets: mut geometric,
        tier: cavity_tier,
    } = {
        let _phase = reporter.phase("Cavity scan");
        cavity_scan::run(&context, &mut rng)?
    };

    // === Phase 2: Energy hot spots ===
    let energy = {
        let _phase = reporter.phase("Energy scan");
        energy_scan::run(&context, &mut rng)?
    };
    let geometric_count = geometric.len();
    let energy_count = energy.len();
    info!(geometric_count, energy_count, "Scanners finished.");

    // === Phase 3: Consensus and scoring ===
    let merged = {
        let _phase = reporter.phase("Consensus");
        for pocket in geometric.iter_mut() {
            scoring::score_geometric(structure, context.atoms(), pocket);
        }
        let mut merged = consensus::merge(geometric, energy, config.distance_threshold);
        scoring::apply_protein_type(&mut merged, config.protein_type);
        merged
    };
    let merged_count = merged.len();

    // === Phase 4: Significance ===
    let outcome = {
        let _phase = reporter.phase("Significance filter");
        significance::filter(merged)
    };
    if outcome.path == FilterPath::Unfiltered {
        reporter.warn(
            "Significance filtering failed, reporting all consensus pockets",
        );
    }

    let agreed = outcome
        .pockets
        .iter()
        .filter(|p| p.methods().len() > 1)
        .count();
    info!(
        predicted = outcome.pockets.len(),
        agreed,
        merged_count,
        "Binding site prediction finished."
    );

    Ok(PredictionResult {
        pockets: outcome.pockets,
        geometric_count,
        energy_count,
        merged_count,
        cavity_tier,
        surface_source,
        filter_path: outcome.path,
    })
}
