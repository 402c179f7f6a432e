//! kd-tree backed neighbour queries over atom coordinates.

use crate::core::models::ids::{AtomId, ResidueId};
use crate::core::models::residue::AminoAcid;
use crate::core::models::structure::Structure;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point3;
use std::collections::BTreeMap;

#[inline]
fn to_array(point: &Point3<f64>) -> [f64; 3] {
    [point.x, point.y, point.z]
}

/// Nearest-neighbour and radius search over a fixed point set.
///
/// Indices returned by queries refer to the position of the point in the slice the
/// index was built from. An empty index answers "no neighbour".
#[derive(Debug)]
pub struct SpatialIndex {
    tree: KdTree<f64, 3>,
    len: usize,
}

impl SpatialIndex {
    pub fn new(points: &[Point3<f64>]) -> Self {
        let coordinates: Vec<[f64; 3]> = points.iter().map(to_array).collect();
        let tree: KdTree<f64, 3> = (&coordinates).into();
        Self {
            tree,
            len: coordinates.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index and distance of the closest point.
    pub fn nearest(&self, query: &Point3<f64>) -> Option<(usize, f64)> {
        if self.is_empty() {
            return None;
        }
        let nearest = self.tree.nearest_one::<SquaredEuclidean>(&to_array(query));
        Some((nearest.item as usize, nearest.distance.sqrt()))
    }

    /// Distance to the closest point, or infinity when the index is empty.
    pub fn nearest_distance(&self, query: &Point3<f64>) -> f64 {
        self.nearest(query)
            .map_or(f64::INFINITY, |(_, distance)| distance)
    }

    /// Indices and distances of all points within `radius` (inclusive), ordered by index.
    pub fn within(&self, query: &Point3<f64>, radius: f64) -> Vec<(usize, f64)> {
        if self.is_empty() || radius < 0.0 {
            return Vec::new();
        }
        let mut hits: Vec<(usize, f64)> = self
            .tree
            .within_unsorted::<SquaredEuclidean>(&to_array(query), radius * radius)
            .into_iter()
            .map(|neighbour| {
                (neighbour.item as usize, neighbour.distance.sqrt())
            })
            .collect();
        hits.sort_unstable_by_key(|&(index, _)| index);
        hits
    }

    pub fn count_within(&self, query: &Point3<f64>, radius: f64) -> usize {
        if self.is_empty() || radius < 0.0 {
            return 0;
        }
        self.tree
            .within_unsorted::<SquaredEuclidean>(&to_array(query), radius * radius)
            .len()
    }
}

/// A [`SpatialIndex`] over a subset of a structure's atoms that maps hits back to atom
/// and residue identifiers.
#[derive(Debug)]
pub struct AtomIndex {
    index: SpatialIndex,
    atom_ids: Vec<AtomId>,
    residue_ids: Vec<ResidueId>,
}

impl AtomIndex {
    /// Indexes every atom of the structure.
    pub fn new(structure: &Structure) -> Self {
        Self::from_atoms(structure, structure.atoms_iter().map(|(id, _)| id))
    }

    /// Indexes only the given atoms; unknown IDs are ignored.
    pub fn from_atoms(structure: &Structure, atom_ids: impl IntoIterator<Item = AtomId>) -> Self {
        let mut positions = Vec::new();
        let mut kept_ids = Vec::new();
        let mut residue_ids = Vec::new();
        for atom_id in atom_ids {
            if let Some(atom) = structure.atom(atom_id) {
                positions.push(atom.position);
                kept_ids.push(atom_id);
                residue_ids.push(atom.residue_id);
            }
        }
        Self {
            index: SpatialIndex::new(&positions),
            atom_ids: kept_ids,
            residue_ids,
        }
    }

    pub fn len(&self) -> usize {
        self.atom_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atom_ids.is_empty()
    }

    pub fn atom_ids(&self) -> &[AtomId] {
        &self.atom_ids
    }

    pub fn nearest_distance(&self, query: &Point3<f64>) -> f64 {
        self.index.nearest_distance(query)
    }

    pub fn count_within(&self, query: &Point3<f64>, radius: f64) -> usize {
        self.index.count_within(query, radius)
    }

    pub fn atoms_within(&self, query: &Point3<f64>, radius: f64) -> Vec<(AtomId, f64)> {
        self.index
            .within(query, radius)
            .into_iter()
            .map(|(i, distance)| (self.atom_ids[i], distance))
            .collect()
    }

    /// Residues with at least one indexed atom within `radius`, each paired with the
    /// distance of its closest atom.
    pub fn residues_within(&self, query: &Point3<f64>, radius: f64) -> Vec<(ResidueId, f64)> {
        let mut closest: BTreeMap<ResidueId, f64> = BTreeMap::new();
        for (i, distance) in self.index.within(query, radius) {
            closest
                .entry(self.residue_ids[i])
                .and_modify(|d| *d = d.min(distance))
                .or_insert(distance);
        }
        closest.into_iter().collect()
    }
}

/// A standard amino acid lining a pocket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LiningResidue {
    pub chain_id: char,
    pub number: isize,
    pub name: String,
    pub amino_acid: AminoAcid,
}

impl AtomIndex {
    /// Standard amino acids with any indexed atom within `radius` of `center`, unique per
    /// (chain, number, name) and sorted in that order.
    pub fn lining_residues(
        &self,
        structure: &Structure,
        center: &Point3<f64>,
        radius: f64,
    ) -> Vec<LiningResidue> {
        let mut residues: Vec<LiningResidue> = self
            .residues_within(center, radius)
            .into_iter()
            .filter_map(|(residue_id, _)| {
                let residue = structure.residue(residue_id)?;
                Some(LiningResidue {
                    chain_id: structure.chain_letter(residue)?,
                    number: residue.number,
                    name: residue.name.clone(),
                    amino_acid: residue.amino_acid()?,
                })
            })
            .collect();
        residues.sort();
        residues.dedup_by(|a, b| {
            a.chain_id == b.chain_id && a.number == b.number && a.name == b.name
        });
        residues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::builder::{AtomRecord, StructureBuilder};

    fn scattered_points() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.1, 0.2, -0.3),
            Point3::new(3.7, 1.9, 0.4),
            Point3::new(-2.2, 4.1, 1.3),
        ]
    }

    #[test]
    fn empty_index_reports_no_neighbour() {
        let index = SpatialIndex::new(&[]);
        assert!(index.is_empty());
        assert!(index.nearest(&Point3::origin()).is_none());
        assert_eq!(index.nearest_distance(&Point3::origin()), f64::INFINITY);
        assert!(index.within(&Point3::origin(), 100.0).is_empty());
        assert_eq!(index.count_within(&Point3::origin(), 100.0), 0);
    }

    #[test]
    fn nearest_returns_closest_point_and_true_distance() {
        let index = SpatialIndex::new(&scattered_points());
        let (i, d) = index.nearest(&Point3::new(3.0, 2.0, 0.0)).unwrap();
        assert_eq!(i, 2);
        let expected = nalgebra::distance(&Point3::new(3.0, 2.0, 0.0), &scattered_points()[2]);
        assert!((d - expected).abs() < 1e-9);
    }

    #[test]
    fn within_matches_brute_force() {
        let points = scattered_points();
        let index = SpatialIndex::new(&points);
        let query = Point3::new(0.5, 0.5, 0.0);
        let hits: Vec<usize> = index
            .within(&query, 2.0)
            .into_iter()
            .map(|(i, _)| i)
            .collect();
        let expected: Vec<usize> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| nalgebra::distance(p, &query) <= 2.0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(hits, expected);
        assert_eq!(index.count_within(&query, 2.0), expected.len());
    }

    #[test]
    fn atom_index_groups_hits_by_residue_with_min_distance() {
        let mut builder = StructureBuilder::new("t");
        let at = |x, y, z| Point3::new(x, y, z);
        builder.add_atom(AtomRecord::new('A', 1, "ALA", "CA", at(1.0, 0.0, 0.0)));
        builder.add_atom(AtomRecord::new('A', 1, "ALA", "CB", at(2.5, 0.3, 0.0)));
        builder.add_atom(AtomRecord::new('A', 2, "SER", "OG", at(0.0, 3.1, 0.2)));
        builder.add_atom(AtomRecord::new('A', 3, "LEU", "CD1", at(20.0, 0.0, 0.0)));
        let structure = builder.build();
        let index = AtomIndex::new(&structure);
        assert_eq!(index.len(), 4);

        let residues = index.residues_within(&Point3::origin(), 8.0);
        assert_eq!(residues.len(), 2);
        let ala = structure.residue(residues[0].0).unwrap();
        assert_eq!(ala.name, "ALA");
        assert!((residues[0].1 - 1.0).abs() < 1e-9);
        assert_eq!(structure.residue(residues[1].0).unwrap().name, "SER");

        assert_eq!(index.atoms_within(&Point3::origin(), 1.5).len(), 1);
    }

    #[test]
    fn lining_residues_are_standard_unique_and_sorted() {
        let mut builder = StructureBuilder::new("t");
        let at = |x, y, z| Point3::new(x, y, z);
        builder.add_atom(AtomRecord::new('B', 4, "TRP", "CZ2", at(1.0, 1.0, 0.0)));
        builder.add_atom(AtomRecord::new('A', 9, "HIS", "NE2", at(0.0, 1.2, 0.5)));
        builder.add_atom(AtomRecord::new('A', 2, "GLY", "CA", at(-1.0, 0.3, 0.0)));
        builder.add_atom(AtomRecord::new('A', 2, "GLY", "C", at(-1.8, 0.9, 0.1)));
        builder.add_atom(
            AtomRecord::new('A', 300, "HEM", "FE", Point3::new(0.1, 0.1, 0.1)).hetero(),
        );
        builder.add_atom(AtomRecord::new('A', 50, "LEU", "CD1", at(30.0, 0.0, 0.0)));
        let structure = builder.build();
        let index = AtomIndex::new(&structure);

        let lining = index.lining_residues(&structure, &Point3::origin(), 8.0);
        let labels: Vec<(char, isize, &str)> = lining
            .iter()
            .map(|r| (r.chain_id, r.number, r.name.as_str()))
            .collect();
        assert_eq!(
            labels,
            vec![('A', 2, "GLY"), ('A', 9, "HIS"), ('B', 4, "TRP")]
        );
    }
}
