use super::context::ScanContext;
use super::progress::Progress;
use crate::core::models::ids::AtomId;
use nalgebra::Point3;
use tracing::{debug, info};

/// Relative exposure above which a residue's atoms count as surface for the energy scan.
pub const ENERGY_SURFACE_THRESHOLD: f64 = 0.2;
/// Relative exposure threshold used by the cavity scanner's surface fallback.
pub const CAVITY_SURFACE_THRESHOLD: f64 = 0.15;

const NEIGHBOUR_RADIUS: f64 = 8.0;
const MAX_SURFACE_NEIGHBOURS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceSource {
    /// Residue exposure from an accessibility service.
    Accessibility,
    /// Sparse local packing; coarser, used when no exposure data exists.
    NeighbourCount,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceAtoms {
    pub atoms: Vec<AtomId>,
    pub positions: Vec<Point3<f64>>,
    pub source: SurfaceSource,
}

impl SurfaceAtoms {
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

/// Selects the solvent-exposed non-hydrogen atoms.
///
/// With exposure data an atom is surface when its residue's relative exposure exceeds
/// `threshold`. Otherwise an atom is surface when fewer than 15 atoms (itself included)
/// lie within 8 Å.
pub fn classify(context: &ScanContext, threshold: f64) -> SurfaceAtoms {
    let structure = context.structure;
    let index = context.atoms();
    let (atoms, source): (Vec<AtomId>, SurfaceSource) = match context.accessibility.exposure() {
        Some(exposure) => (
            structure
                .heavy_atoms()
                .filter(|(_, atom)| {
                    exposure
                        .get(&atom.residue_id)
                        .is_some_and(|&fraction| fraction > threshold)
                })
                .map(|(id, _)| id)
                .collect(),
            SurfaceSource::Accessibility,
        ),
        None => (
            structure
                .heavy_atoms()
                .filter(|(_, atom)| {
                    index.count_within(&atom.position, NEIGHBOUR_RADIUS) < MAX_SURFACE_NEIGHBOURS
                })
                .map(|(id, _)| id)
                .collect(),
            SurfaceSource::NeighbourCount,
        ),
    };

    let positions = atoms
        .iter()
        .filter_map(|&id| structure.atom(id).map(|atom| atom.position))
        .collect();

    info!(count = atoms.len(), source = ?source, threshold, "Classified surface atoms.");
    if source == SurfaceSource::NeighbourCount {
        debug!(
            "Surface classification used the neighbour-count approximation."
        );
    }
    context.reporter.report(Progress::Message(format!(
        "Identified {} surface atoms",
        atoms.len()
    )));

    SurfaceAtoms {
        atoms,
        positions,
        source,
    }
}
