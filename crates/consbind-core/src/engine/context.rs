use super::accessibility::Accessibility;
use super::config::PredictionConfig;
use super::progress::ProgressReporter;
use crate::core::models::structure::Structure;
use crate::core::spatial::AtomIndex;

/// Read-only state shared by every task of one prediction run.
///
/// Spatial indices are built once here: `atoms` covers every atom of the structure
/// (waters and ligands included), `hetero` only non-water HETATM atoms.
pub struct ScanContext<'a> {
    pub structure: &'a Structure,
    pub config: &'a PredictionConfig,
    pub reporter: &'a ProgressReporter<'a>,
    pub accessibility: &'a Accessibility,
    atoms: AtomIndex,
    hetero: AtomIndex,
}

impl<'a> ScanContext<'a> {
    pub fn new(
        structure: &'a Structure,
        config: &'a PredictionConfig,
        reporter: &'a ProgressReporter<'a>,
        accessibility: &'a Accessibility,
    ) -> Self {
        let atoms = AtomIndex::new(structure);
        let hetero = AtomIndex::from_atoms(structure, structure.hetero_atoms().map(|(id, _)| id));
        Self {
            structure,
            config,
            reporter,
            accessibility,
            atoms,
            hetero,
        }
    }

    pub fn atoms(&self) -> &AtomIndex {
        &self.atoms
    }

    pub fn hetero(&self) -> &AtomIndex {
        &self.hetero
    }
}
