use super::atom::Atom;
use super::chain::Chain;
use super::ids::{AtomId, ChainId, ResidueId};
use super::residue::Residue;
use nalgebra::Point3;
use slotmap::SlotMap;
use std::collections::HashMap;

/// A parsed protein model: ordered chains of residues, each owning its atoms.
///
/// The structure is read-only for the entire prediction pipeline. It can only be
/// assembled through [`StructureBuilder`](super::builder::StructureBuilder), after which
/// every stage borrows it immutably.
#[derive(Debug, Clone, Default)]
pub struct Structure {
    /// Identifier of the structure, usually the file stem.
    name: String,
    /// Primary storage for atoms using a slot map for efficient ID management.
    atoms: SlotMap<AtomId, Atom>,
    /// Primary storage for residues using a slot map for efficient ID management.
    residues: SlotMap<ResidueId, Residue>,
    /// Primary storage for chains using a slot map for efficient ID management.
    chains: SlotMap<ChainId, Chain>,
    /// Chains in the order they were first encountered.
    chain_order: Vec<ChainId>,
    /// Lookup map for finding residues by chain, sequence number and insertion code.
    residue_id_map: HashMap<(ChainId, isize, char), ResidueId>,
    /// Lookup map for finding chains by their single-character identifier.
    chain_id_map: HashMap<char, ChainId>,
}

impl Structure {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Iterates over all atoms in insertion (file) order.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.atoms.iter()
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn residue(&self, id: ResidueId) -> Option<&Residue> {
        self.residues.get(id)
    }

    pub fn residues_iter(&self) -> impl Iterator<Item = (ResidueId, &Residue)> {
        self.residues.iter()
    }

    pub fn chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains.get(id)
    }

    /// Iterates over chains in the order they appear in the source file.
    pub fn chains_iter(&self) -> impl Iterator<Item = (ChainId, &Chain)> {
        self.chain_order
            .iter()
            .filter_map(|&id| self.chains.get(id).map(|chain| (id, chain)))
    }

    pub fn find_chain_by_id(&self, id: char) -> Option<ChainId> {
        self.chain_id_map.get(&id).copied()
    }

    pub fn find_residue_by_id(
        &self,
        chain_id: ChainId,
        residue_number: isize,
        insertion_code: char,
    ) -> Option<ResidueId> {
        self.residue_id_map
            .get(&(chain_id, residue_number, insertion_code))
            .copied()
    }

    /// Residue owning the given atom.
    pub fn residue_of(&self, atom_id: AtomId) -> Option<&Residue> {
        self.atom(atom_id)
            .and_then(|atom| self.residues.get(atom.residue_id))
    }

    /// Single-character identifier of the chain that owns a residue.
    pub fn chain_letter(&self, residue: &Residue) -> Option<char> {
        self.chains.get(residue.chain_id).map(|chain| chain.id)
    }

    /// All non-hydrogen atoms.
    pub fn heavy_atoms(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.atoms.iter().filter(|(_, atom)| !atom.is_hydrogen())
    }

    /// HETATM atoms that do not belong to water, i.e. ligands, cofactors and ions.
    pub fn hetero_atoms(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.atoms.iter().filter(|(_, atom)| {
            atom.is_hetero
                && !self
                    .residues
                    .get(atom.residue_id)
                    .is_some_and(Residue::is_water)
        })
    }

    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.atoms.values().map(|atom| atom.position).collect()
    }

    pub(crate) fn add_chain(&mut self, id: char) -> ChainId {
        *self.chain_id_map.entry(id).or_insert_with(|| {
            let chain_id = self.chains.insert(Chain::new(id));
            self.chain_order.push(chain_id);
            chain_id
        })
    }

    pub(crate) fn add_residue(
        &mut self,
        chain_id: ChainId,
        residue_number: isize,
        insertion_code: char,
        name: &str,
    ) -> Option<ResidueId> {
        let chain = self.chains.get_mut(chain_id)?;
        let key = (chain_id, residue_number, insertion_code);

        let residue_id = *self.residue_id_map.entry(key).or_insert_with(|| {
            let residue = Residue::new(residue_number, insertion_code, name, chain_id);
            let residue_id = self.residues.insert(residue);
            chain.residues.push(residue_id);
            residue_id
        });

        Some(residue_id)
    }

    pub(crate) fn add_atom_to_residue(
        &mut self,
        residue_id: ResidueId,
        atom: Atom,
    ) -> Option<AtomId> {
        if !self.residues.contains_key(residue_id) {
            return None;
        }
        let atom_id = self.atoms.insert(Atom { residue_id, ..atom });
        if let Some(residue) = self.residues.get_mut(residue_id) {
            residue.atoms.push(atom_id);
        }
        Some(atom_id)
    }
}
