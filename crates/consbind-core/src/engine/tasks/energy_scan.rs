use crate::core::models::pocket::{DetectionMethod, Pocket, PocketBuilder};
use crate::core::spatial::SpatialIndex;
use crate::core::utils::geometry::{BoundingBox, Lattice, centroid};
use crate::engine::cluster::{Criterion, Linkage, cluster};
use crate::engine::context::ScanContext;
use crate::engine::error::EngineError;
use crate::engine::progress::Progress;
use crate::engine::surface::{self, ENERGY_SURFACE_THRESHOLD};
use nalgebra::Point3;
use rand::Rng;
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const BOX_PADDING: f64 = 5.0;
const MAX_SAMPLE_POINTS: usize = 5_000;
const MIN_SURFACE_DISTANCE: f64 = 1.0;
const MAX_SURFACE_DISTANCE: f64 = 5.0;
const FIELD_RADIUS: f64 = 8.0;
const HYDROPHOBIC_WEIGHT: f64 = 2.0;
const ELECTROSTATIC_WEIGHT: f64 = 0.5;
const HOT_SPOT_THRESHOLD: f64 = 3.0;
const CLUSTER_DISTANCE: f64 = 3.5;
const MIN_CLUSTER_SIZE: usize = 3;

/// A sampled lattice point whose field score passed the hot-spot threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyPoint {
    pub position: Point3<f64>,
    pub hydrophobicity: f64,
    pub electrostatics: f64,
    pub score: f64,
}

/// Mean Kyte–Doolittle hydropathy of the standard residues with an atom within 8 Å.
pub fn hydrophobicity(context: &ScanContext, point: &Point3<f64>) -> f64 {
    let values: Vec<f64> = context
        .atoms()
        .residues_within(point, FIELD_RADIUS)
        .into_iter()
        .filter_map(|(residue_id, _)| {
            context.structure.residue(residue_id)?.amino_acid()
        })
        .map(|amino_acid| amino_acid.hydropathy())
        .collect();
    values.iter().sum::<f64>() / values.len().max(1) as f64
}

/// Coulomb-like sum of residue charges within 8 Å, each damped by the residue's closest
/// atom distance (floored at 1 Å).
pub fn electrostatics(context: &ScanContext, point: &Point3<f64>) -> f64 {
    context
        .atoms()
        .residues_within(point, FIELD_RADIUS)
        .into_iter()
        .filter_map(|(residue_id, distance)| {
            let charge = context
                .structure
                .residue(residue_id)?
                .amino_acid()?
                .field_charge()?;
            Some(charge / distance.max(1.0))
        })
        .sum()
}

pub(crate) fn evaluate_point(context: &ScanContext, position: Point3<f64>) -> EnergyPoint {
    let hydrophobicity = hydrophobicity(context, &position);
    let electrostatics = electrostatics(context, &position);
    EnergyPoint {
        position,
        hydrophobicity,
        electrostatics,
        score: HYDROPHOBIC_WEIGHT * hydrophobicity + ELECTROSTATIC_WEIGHT * electrostatics.abs(),
    }
}

/// Physicochemical hot-spot detection over the solvent-exposed surface.
#[instrument(skip_all, name = "energy_scan_task")]
pub fn run(context: &ScanContext, rng: &mut impl Rng) -> Result<Vec<Pocket>, EngineError> {
    let surface = surface::classify(context, ENERGY_SURFACE_THRESHOLD);
    let Some(bounds) = BoundingBox::from_points(&surface.positions) else {
        context
            .reporter
            .warn("No surface atoms found, skipping energy scan");
        return Ok(Vec::new());
    };

    let spacing = context.config.grid_spacing * 2.0;
    let lattice = Lattice::new(&bounds.padded(BOX_PADDING), spacing);
    let samples = lattice.sample(MAX_SAMPLE_POINTS, rng);
    let surface_index = SpatialIndex::new(&surface.positions);
    info!(
        lattice_points = lattice.len(),
        sampled = samples.len(),
        spacing,
        "Starting energy scan."
    );

    context.reporter.report(Progress::TaskStart {
        total_steps: samples.len() as u64,
    });

    #[cfg(not(feature = "parallel"))]
    let iterator = samples.iter();

    #[cfg(feature = "parallel")]
    let iterator = samples.par_iter();

    let hot_spots: Vec<EnergyPoint> = iterator
        .filter_map(|&position| {
            context.reporter.report(Progress::TaskIncrement);
            let distance = surface_index.nearest_distance(&position);
            if !(MIN_SURFACE_DISTANCE..=MAX_SURFACE_DISTANCE).contains(&distance) {
                return None;
            }
            let point = evaluate_point(context, position);
            (point.score > HOT_SPOT_THRESHOLD).then_some(point)
        })
        .collect();

    context.reporter.report(Progress::TaskFinish);
    info!(count = hot_spots.len(), "Found high-energy points.");

    let pockets = cluster_hot_spots(&hot_spots)?;
    info!(count = pockets.len(), "Energy scan found pockets.");
    Ok(pockets)
}

fn cluster_hot_spots(hot_spots: &[EnergyPoint]) -> Result<Vec<Pocket>, EngineError> {
    let coordinates: Vec<[f64; 3]> = hot_spots
        .iter()
        .map(|p| [p.position.x, p.position.y, p.position.z])
        .collect();
    let clustering = cluster(
        &coordinates,
        Linkage::Average,
        Criterion::Distance(CLUSTER_DISTANCE),
    )
    .map_err(|source| EngineError::Clustering {
        phase: "energy scan",
        source,
    })?;

    let mut pockets = Vec::new();
    for members in clustering.groups() {
        if members.len() < MIN_CLUSTER_SIZE {
            debug!(size = members.len(), "Dropped small energy cluster.");
            continue;
        }
        let positions: Vec<Point3<f64>> = members.iter().map(|&i| hot_spots[i].position).collect();
        let Some(center) = centroid(&positions) else {
            continue;
        };
        let mean_score =
            members.iter().map(|&i| hot_spots[i].score).sum::<f64>() / members.len() as f64;
        pockets.push(
            PocketBuilder::new(DetectionMethod::Energy, center)
                .points(positions)
                .raw_score(mean_score)
                .build(),
        );
    }
    Ok(pockets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::builder::{AtomRecord, StructureBuilder};
    use crate::core::models::structure::Structure;
    use crate::core::utils::geometry::fibonacci_sphere;
    use crate::engine::accessibility::Accessibility;
    use crate::engine::config::PredictionConfig;
    use crate::engine::progress::ProgressReporter;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    /// An isoleucine and a lysine on the x axis, plus a water that must be ignored.
    fn field_fragment() -> Structure {
        let mut builder = StructureBuilder::new("field");
        let at = |x, y, z| Point3::new(x, y, z);
        builder.add_atom(AtomRecord::new('A', 1, "ILE", "CD1", at(2.0, 0.0, 0.0)));
        builder.add_atom(AtomRecord::new('A', 2, "LYS", "NZ", at(-4.0, 0.0, 0.0)));
        builder.add_atom(
            AtomRecord::new('W', 1, "HOH", "O", Point3::new(0.0, 3.0, 0.0)).hetero(),
        );
        builder.build()
    }

    #[test]
    fn field_terms_follow_nearby_residues() {
        let structure = field_fragment();
        let config = PredictionConfig::default();
        let reporter = ProgressReporter::new();
        let accessibility = Accessibility::Unavailable;
        let context = ScanContext::new(&structure, &config, &reporter, &accessibility);

        let origin = Point3::origin();
        assert_close(hydrophobicity(&context, &origin), (4.5 - 3.9) / 2.0);
        assert_close(electrostatics(&context, &origin), 1.0 / 4.0);

        let point = evaluate_point(&context, origin);
        assert_close(point.score, 2.0 * 0.3 + 0.5 * 0.25);
    }

    #[test]
    fn field_terms_vanish_far_from_protein() {
        let structure = field_fragment();
        let config = PredictionConfig::default();
        let reporter = ProgressReporter::new();
        let accessibility = Accessibility::Unavailable;
        let context = ScanContext::new(&structure, &config, &reporter, &accessibility);

        let far = Point3::new(50.0, 0.0, 0.0);
        assert_eq!(hydrophobicity(&context, &far), 0.0);
        assert_eq!(electrostatics(&context, &far), 0.0);
    }

    #[test]
    fn hydrophobic_patch_becomes_an_energy_pocket() {
        let mut builder = StructureBuilder::new("patch");
        for (i, direction) in fibonacci_sphere(12).into_iter().enumerate() {
            let position = Point3::origin() + direction * 3.0;
            builder.add_atom(AtomRecord::new('A', i as isize + 1, "ILE", "CD1", position));
        }
        let structure = builder.build();
        let config = PredictionConfig::default();
        let reporter = ProgressReporter::new();
        let accessibility = Accessibility::Unavailable;
        let context = ScanContext::new(&structure, &config, &reporter, &accessibility);
        let mut rng = StdRng::seed_from_u64(5);

        let pockets = run(&context, &mut rng).unwrap();
        assert!(!pockets.is_empty());
        for pocket in &pockets {
            assert_eq!(pocket.origin(), DetectionMethod::Energy);
            assert!(pocket.size() >= MIN_CLUSTER_SIZE);
            assert_close(pocket.raw_score(), 9.0);
            assert!(pocket.druggability().is_none());
        }
    }

    #[test]
    fn structure_without_surface_has_no_energy_pockets() {
        let structure = StructureBuilder::new("empty").build();
        let config = PredictionConfig::default();
        let reporter = ProgressReporter::new();
        let accessibility = Accessibility::Unavailable;
        let context = ScanContext::new(&structure, &config, &reporter, &accessibility);
        let mut rng = StdRng::seed_from_u64(5);

        assert!(run(&context, &mut rng).unwrap().is_empty());
    }
}
