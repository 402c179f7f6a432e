use super::ids::ResidueId;
use nalgebra::Point3;

/// Represents an atom read from a structure file.
///
/// Atoms are immutable once the owning `Structure` is built; every pipeline stage
/// only reads positions and classification flags from them.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The serial number from the source file.
    pub serial: usize,
    /// The name of the atom (e.g., "CA", "N", "OG1").
    pub name: String,
    /// The element symbol, upper-cased (e.g., "C", "FE").
    pub element: String,
    /// The ID of the parent residue this atom belongs to.
    pub residue_id: ResidueId,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
    /// Crystallographic occupancy.
    pub occupancy: f64,
    /// Crystallographic temperature factor.
    pub b_factor: f64,
    /// Whether the atom came from a HETATM record.
    pub is_hetero: bool,
}

impl Atom {
    pub fn new(name: &str, element: &str, residue_id: ResidueId, position: Point3<f64>) -> Self {
        Self {
            serial: 0,
            name: name.to_string(),
            element: element.to_ascii_uppercase(),
            residue_id,
            position,
            occupancy: 1.0,
            b_factor: 0.0,
            is_hetero: false,
        }
    }

    /// Hydrogen and deuterium are treated alike.
    pub fn is_hydrogen(&self) -> bool {
        matches!(self.element.as_str(), "H" | "D")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn dummy_residue_id() -> ResidueId {
        ResidueId::from(KeyData::from_ffi(1))
    }

    #[test]
    fn new_atom_normalizes_element_and_sets_defaults() {
        let atom = Atom::new("CA", "c", dummy_residue_id(), Point3::new(1.0, 2.0, 3.0));
        assert_eq!(atom.element, "C");
        assert_eq!(atom.occupancy, 1.0);
        assert_eq!(atom.b_factor, 0.0);
        assert!(!atom.is_hetero);
        assert_eq!(atom.position, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn is_hydrogen_recognizes_hydrogen_and_deuterium() {
        let id = dummy_residue_id();
        assert!(Atom::new("HA", "H", id, Point3::origin()).is_hydrogen());
        assert!(Atom::new("D1", "D", id, Point3::origin()).is_hydrogen());
        assert!(!Atom::new("HG", "HG", id, Point3::origin()).is_hydrogen());
        assert!(!Atom::new("CA", "C", id, Point3::origin()).is_hydrogen());
    }
}
