use super::atom::Atom;
use super::ids::AtomId;
use super::structure::Structure;
use nalgebra::Point3;

/// One ATOM/HETATM record as delivered by a structure reader.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomRecord<'a> {
    pub serial: usize,
    pub name: &'a str,
    pub element: Option<&'a str>,
    pub residue_name: &'a str,
    pub chain_id: char,
    pub residue_number: isize,
    pub insertion_code: char,
    pub position: Point3<f64>,
    pub occupancy: f64,
    pub b_factor: f64,
    pub is_hetero: bool,
}

impl<'a> AtomRecord<'a> {
    pub fn new(
        chain_id: char,
        residue_number: isize,
        residue_name: &'a str,
        name: &'a str,
        position: Point3<f64>,
    ) -> Self {
        Self {
            serial: 0,
            name,
            element: None,
            residue_name,
            chain_id,
            residue_number,
            insertion_code: ' ',
            position,
            occupancy: 1.0,
            b_factor: 0.0,
            is_hetero: false,
        }
    }

    pub fn element(mut self, element: &'a str) -> Self {
        self.element = Some(element);
        self
    }

    pub fn hetero(mut self) -> Self {
        self.is_hetero = true;
        self
    }
}

/// Guesses the element symbol from a PDB atom name when no element column is present.
///
/// Leading digits are skipped ("1HB" is a hydrogen); the first remaining letter is taken.
pub fn infer_element(atom_name: &str) -> String {
    atom_name
        .trim()
        .chars()
        .find(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase().to_string())
        .unwrap_or_else(|| "X".to_string())
}

/// Assembles a [`Structure`] from atom records in file order.
///
/// Chains and residues are created on first sight; repeated records for the same
/// chain/residue key append to the existing entries.
#[derive(Debug, Default)]
pub struct StructureBuilder {
    structure: Structure,
}

impl StructureBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            structure: Structure::new(name),
        }
    }

    pub fn add_atom(&mut self, record: AtomRecord<'_>) -> Option<AtomId> {
        let chain_id = self.structure.add_chain(record.chain_id);
        let residue_id = self.structure.add_residue(
            chain_id,
            record.residue_number,
            record.insertion_code,
            record.residue_name,
        )?;

        let element = match record.element.map(str::trim) {
            Some(symbol) if !symbol.is_empty() => symbol.to_ascii_uppercase(),
            _ => infer_element(record.name),
        };

        let atom = Atom {
            serial: record.serial,
            name: record.name.trim().to_string(),
            element,
            residue_id,
            position: record.position,
            occupancy: record.occupancy,
            b_factor: record.b_factor,
            is_hetero: record.is_hetero,
        };
        self.structure.add_atom_to_residue(residue_id, atom)
    }

    pub fn atom_count(&self) -> usize {
        self.structure.atom_count()
    }

    pub fn build(self) -> Structure {
        self.structure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_element_skips_digits_and_takes_first_letter() {
        assert_eq!(infer_element(" CA "), "C");
        assert_eq!(infer_element("1HB"), "H");
        assert_eq!(infer_element("OG1"), "O");
        assert_eq!(infer_element("123"), "X");
    }

    #[test]
    fn builder_groups_records_into_chains_and_residues() {
        let mut builder = StructureBuilder::new("frag");
        let at = |x, y, z| Point3::new(x, y, z);
        builder.add_atom(AtomRecord::new('A', 1, "ALA", "N", at(0.0, 0.0, 0.0)));
        builder.add_atom(AtomRecord::new('A', 1, "ALA", "CA", at(1.5, 0.0, 0.0)));
        builder.add_atom(AtomRecord::new('A', 2, "GLY", "CA", at(3.0, 0.0, 0.0)));
        builder.add_atom(
            AtomRecord::new('B', 100, "ZN", "ZN", Point3::new(6.0, 0.0, 0.0))
                .element("zn")
                .hetero(),
        );
        assert_eq!(builder.atom_count(), 4);
        let structure = builder.build();

        assert_eq!(structure.name(), "frag");
        assert_eq!(structure.chains_iter().count(), 2);
        let chain_a = structure.find_chain_by_id('A').unwrap();
        assert_eq!(structure.chain(chain_a).unwrap().residues().len(), 2);

        let ala = structure.find_residue_by_id(chain_a, 1, ' ').unwrap();
        assert_eq!(structure.residue(ala).unwrap().atoms().len(), 2);

        let zinc: Vec<_> = structure.hetero_atoms().collect();
        assert_eq!(zinc.len(), 1);
        assert_eq!(zinc[0].1.element, "ZN");
    }

    #[test]
    fn empty_builder_produces_empty_structure() {
        let structure = StructureBuilder::new("empty").build();
        assert!(structure.is_empty());
        assert_eq!(structure.chains_iter().count(), 0);
    }
}
