use crate::core::models::pocket::{DetectionMethod, Pocket, PocketBuilder};
use crate::core::spatial::AtomIndex;
use crate::core::utils::geometry::{BoundingBox, Lattice, centroid, random_unit_vector};
use crate::engine::cluster::{Criterion, Linkage, cluster, dbscan};
use crate::engine::context::ScanContext;
use crate::engine::error::EngineError;
use crate::engine::progress::Progress;
use crate::engine::surface::{self, CAVITY_SURFACE_THRESHOLD};
use nalgebra::{Point3, Vector3};
use rand::Rng;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const BOX_PADDING: f64 = 10.0;
const MAX_SAMPLE_POINTS: usize = 10_000;
const MAX_CAVITY_DISTANCE: f64 = 4.0;
const HETERO_CONTACT_DISTANCE: f64 = 4.0;
const RAY_STEPS: usize = 9;
const CLUSTER_DISTANCE: f64 = 3.0;

const RELAXED_PROBE_RADIUS: f64 = 1.8;
const RELAXED_MIN_SIZE: usize = 3;

const MIN_SURFACE_ATOMS: usize = 5;
const SURFACE_EPS: f64 = 3.5;
const SURFACE_MIN_SAMPLES: usize = 5;
const CONCAVITY_DIRECTIONS: usize = 20;
const CONCAVITY_HIT_DISTANCE: f64 = 2.0;
const CONCAVITY_MIN_FRACTION: f64 = 0.7;

/// Which escalation level of the cavity scan produced the pockets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CavityTier {
    /// Configured probe radius and minimum size.
    Standard,
    /// Wider probe (1.8 Å) and smaller minimum cluster (3).
    Relaxed,
    /// Concave clusters of surface atoms.
    SurfaceFallback,
}

#[derive(Debug, Clone, Default)]
pub struct CavityScan {
    pub pockets: Vec<Pocket>,
    /// `None` when every tier came back empty.
    pub tier: Option<CavityTier>,
}

/// Grid-based geometric cavity detection with two escalation tiers.
#[instrument(skip_all, name = "cavity_scan_task")]
pub fn run(context: &ScanContext, rng: &mut impl Rng) -> Result<CavityScan, EngineError> {
    let atom_positions = context
        .structure
        .atoms_iter()
        .map(|(_, atom)| &atom.position);
    let Some(bounds) = BoundingBox::from_points(atom_positions) else {
        info!("Structure has no atoms, skipping cavity scan.");
        return Ok(CavityScan::default());
    };
    let lattice = Lattice::new(&bounds.padded(BOX_PADDING), context.config.grid_spacing);
    info!(
        lattice_points = lattice.len(),
        spacing = context.config.grid_spacing,
        "Starting cavity scan."
    );

    let tiers = [
        (
            CavityTier::Standard,
            context.config.probe_radius,
            context.config.min_size,
        ),
        (CavityTier::Relaxed, RELAXED_PROBE_RADIUS, RELAXED_MIN_SIZE),
    ];
    for (tier, probe_radius, min_size) in tiers {
        let pockets = grid_pockets(context, &lattice, probe_radius, min_size, rng)?;
        if !pockets.is_empty() {
            info!(count = pockets.len(), tier = ?tier, "Cavity scan found pockets.");
            return Ok(CavityScan {
                pockets,
                tier: Some(tier),
            });
        }
        debug!(tier = ?tier, probe_radius, min_size, "No cavities at this tier.");
    }

    context
        .reporter
        .warn(
            "No enclosed cavities found, falling back to concave surface regions",
        );
    let pockets = surface_pockets(context, rng)?;
    info!(count = pockets.len(), "Surface fallback finished.");
    let tier = (!pockets.is_empty()).then_some(CavityTier::SurfaceFallback);
    Ok(CavityScan { pockets, tier })
}

fn grid_pockets(
    context: &ScanContext,
    lattice: &Lattice,
    probe_radius: f64,
    min_size: usize,
    rng: &mut impl Rng,
) -> Result<Vec<Pocket>, EngineError> {
    let samples = lattice.sample(MAX_SAMPLE_POINTS, rng);
    context.reporter.report(Progress::TaskStart {
        total_steps: samples.len() as u64,
    });

    #[cfg(not(feature = "parallel"))]
    let iterator = samples.iter();

    #[cfg(feature = "parallel")]
    let iterator = samples.par_iter();

    let cavity_points: Vec<Point3<f64>> = iterator
        .filter(|point| {
            let keep = is_cavity_point(context, point, probe_radius);
            context.reporter.report(Progress::TaskIncrement);
            keep
        })
        .copied()
        .collect();

    context.reporter.report(Progress::TaskFinish);
    debug!(
        sampled = samples.len(),
        cavity_points = cavity_points.len(),
        probe_radius,
        "Evaluated cavity grid."
    );

    cluster_cavity_points(&cavity_points, min_size)
}

/// A point is a cavity point when it sits in the probe-accessible shell around the
/// protein (or touches a ligand) and every axis ray from it runs into an atom.
pub(crate) fn is_cavity_point(
    context: &ScanContext,
    point: &Point3<f64>,
    probe_radius: f64,
) -> bool {
    let nearest = context.atoms().nearest_distance(point);
    let in_shell = nearest > probe_radius && nearest < MAX_CAVITY_DISTANCE;
    let near_ligand = !in_shell
        && !context.hetero().is_empty()
        && context.hetero().nearest_distance(point) < HETERO_CONTACT_DISTANCE;

    (in_shell || near_ligand) && is_enclosed(context.atoms(), point, probe_radius)
}

fn is_enclosed(atoms: &AtomIndex, point: &Point3<f64>, probe_radius: f64) -> bool {
    let axes = [
        Vector3::x(),
        -Vector3::x(),
        Vector3::y(),
        -Vector3::y(),
        Vector3::z(),
        -Vector3::z(),
    ];
    axes.iter()
        .all(|direction| ray_hits(atoms, point, direction, probe_radius))
}

/// Walks 1..=9 Å along `direction` and reports whether any step lands closer than
/// `threshold` to an atom.
fn ray_hits(
    atoms: &AtomIndex,
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
    threshold: f64,
) -> bool {
    (1..=RAY_STEPS).any(|step| {
        let sample = origin + direction * step as f64;
        atoms.nearest_distance(&sample) < threshold
    })
}

fn cluster_cavity_points(
    points: &[Point3<f64>],
    min_size: usize,
) -> Result<Vec<Pocket>, EngineError> {
    let coordinates: Vec<[f64; 3]> = points.iter().map(|p| [p.x, p.y, p.z]).collect();
    let clustering = cluster(
        &coordinates,
        Linkage::Single,
        Criterion::Distance(CLUSTER_DISTANCE),
    )
    .map_err(|source| EngineError::Clustering {
        phase: "cavity scan",
        source,
    })?;

    Ok(clustering
        .groups()
        .into_iter()
        .filter(|members| members.len() >= min_size)
        .filter_map(|members| {
            let members: Vec<Point3<f64>> = members.into_iter().map(|i| points[i]).collect();
            let center = centroid(&members)?;
            Some(
                PocketBuilder::new(DetectionMethod::Geometric, center)
                    .points(members)
                    .build(),
            )
        })
        .collect())
}

fn surface_pockets(context: &ScanContext, rng: &mut impl Rng) -> Result<Vec<Pocket>, EngineError> {
    let surface = surface::classify(context, CAVITY_SURFACE_THRESHOLD);
    if surface.len() <= MIN_SURFACE_ATOMS {
        debug!(
            surface_atoms = surface.len(),
            "Too few surface atoms for the surface fallback."
        );
        return Ok(Vec::new());
    }

    let labels = dbscan(&surface.positions, SURFACE_EPS, SURFACE_MIN_SAMPLES).map_err(|source| {
        EngineError::Clustering {
            phase: "surface fallback",
            source,
        }
    })?;

    let mut groups: BTreeMap<usize, Vec<Point3<f64>>> = BTreeMap::new();
    for (position, label) in surface.positions.iter().zip(labels) {
        if let Some(label) = label {
            groups.entry(label).or_default().push(*position);
        }
    }

    let mut pockets = Vec::new();
    for members in groups.into_values() {
        let Some(center) = centroid(&members) else {
            continue;
        };
        if is_concave(context.atoms(), &center, rng) {
            pockets.push(
                PocketBuilder::new(DetectionMethod::Geometric, center)
                    .points(members)
                    .build(),
            );
        } else {
            debug!(center = ?center, "Rejected convex surface cluster.");
        }
    }
    Ok(pockets)
}

/// Casts random rays from `point`; at least 70% of them must reach the protein.
pub(crate) fn is_concave(atoms: &AtomIndex, point: &Point3<f64>, rng: &mut impl Rng) -> bool {
    let mut hits = 0;
    for _ in 0..CONCAVITY_DIRECTIONS {
        let direction = random_unit_vector(rng);
        if ray_hits(atoms, point, &direction, CONCAVITY_HIT_DISTANCE) {
            hits += 1;
        }
    }
    hits as f64 >= CONCAVITY_DIRECTIONS as f64 * CONCAVITY_MIN_FRACTION
}
