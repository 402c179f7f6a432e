use crate::core::models::pocket::Pocket;
use crate::core::models::residue::AminoAcid;
use crate::core::models::structure::Structure;
use crate::core::spatial::{AtomIndex, LiningResidue};
use crate::engine::config::ProteinType;
use std::collections::BTreeSet;
use tracing::debug;

/// Radius in Å around a pocket center within which residues line the pocket.
pub const LINING_RADIUS: f64 = 8.0;

const VOXEL_VOLUME: f64 = 8.0;
const IDEAL_VOLUME: f64 = 500.0;
const VOLUME_TOLERANCE: f64 = 300.0;
const IDEAL_HYDROPHOBIC_FRACTION: f64 = 0.6;
const HYDROPHOBIC_TOLERANCE: f64 = 0.4;

const CATALYTIC_PAIRS: [[AminoAcid; 2]; 6] = [
    [AminoAcid::Histidine, AminoAcid::AsparticAcid],
    [AminoAcid::Serine, AminoAcid::Histidine],
    [AminoAcid::Cysteine, AminoAcid::Histidine],
    [AminoAcid::Lysine, AminoAcid::AsparticAcid],
    [AminoAcid::Arginine, AminoAcid::AsparticAcid],
    [AminoAcid::Arginine, AminoAcid::GlutamicAcid],
];

const CATALYTIC_TRIADS: [[AminoAcid; 3]; 2] = [
    [AminoAcid::Serine, AminoAcid::Histidine, AminoAcid::AsparticAcid],
    [AminoAcid::Cysteine, AminoAcid::Histidine, AminoAcid::AsparticAcid],
];

const ENZYME_KNOWLEDGE_CUTOFF: f64 = 1.5;
const ENZYME_BOOST: f64 = 1.3;
const TRANSPORTER_SIZE_CUTOFF: usize = 300;
const TRANSPORTER_BOOST: f64 = 1.2;
const RECEPTOR_DRUGGABILITY_CUTOFF: f64 = 0.6;
const RECEPTOR_BOOST: f64 = 1.15;

/// Druggability in [0, 1] from the approximate pocket volume (`size × 8 Å³`, ideal 500)
/// and the hydrophobic fraction of its lining residues (ideal 0.6).
pub fn druggability(size: usize, residues: &[LiningResidue]) -> f64 {
    let volume = size as f64 * VOXEL_VOLUME;
    let hydrophobic = residues
        .iter()
        .filter(|r| r.amino_acid.is_hydrophobic())
        .count();
    let fraction = hydrophobic as f64 / residues.len().max(1) as f64;

    let volume_score = (1.0 - (volume - IDEAL_VOLUME).abs() / VOLUME_TOLERANCE).max(0.0);
    let hydrophobic_score =
        (1.0 - (fraction - IDEAL_HYDROPHOBIC_FRACTION).abs() / HYDROPHOBIC_TOLERANCE).max(0.0);
    (volume_score + hydrophobic_score) / 2.0
}

/// Rule-based score for residue patterns typical of binding sites.
pub fn knowledge_score(residues: &[LiningResidue]) -> f64 {
    let types: Vec<AminoAcid> = residues.iter().map(|r| r.amino_acid).collect();
    let present: BTreeSet<AminoAcid> = types.iter().copied().collect();

    let mut score = 0.0;

    let hydrophilic =
        count_where(&types, AminoAcid::is_polar) + count_where(&types, AminoAcid::is_charged);
    if count_where(&types, AminoAcid::is_hydrophobic) > 0 && hydrophilic > 0 {
        score += 1.0;
    }

    let pairs = CATALYTIC_PAIRS
        .iter()
        .filter(|pair| contains_all(&present, &pair[..]))
        .count();
    score += 0.5 * pairs as f64;

    if count_where(&types, AminoAcid::is_aromatic) >= 2 {
        score += 0.5;
    }

    // Heme pocket.
    if present.contains(&AminoAcid::Histidine)
        && (present.contains(&AminoAcid::Methionine) || present.contains(&AminoAcid::Cysteine))
    {
        score += 1.0;
    }

    // Glycine-rich nucleotide loop.
    let glycines = types.iter().filter(|&&aa| aa == AminoAcid::Glycine).count();
    if glycines >= 3
        && (present.contains(&AminoAcid::Lysine) || present.contains(&AminoAcid::Arginine))
    {
        score += 1.0;
    }

    if count_where(&types, AminoAcid::is_metal_coordinating) >= 3 {
        score += 1.0;
    }

    if CATALYTIC_TRIADS.iter().any(|t| contains_all(&present, t)) {
        score += 1.5;
    }

    score
}

fn count_where(types: &[AminoAcid], predicate: fn(&AminoAcid) -> bool) -> usize {
    types.iter().filter(|aa| predicate(aa)).count()
}

fn contains_all(present: &BTreeSet<AminoAcid>, group: &[AminoAcid]) -> bool {
    group.iter().all(|aa| present.contains(aa))
}

/// Attaches druggability and knowledge scores to a geometric pocket, which also
/// derives its raw score.
pub fn score_geometric(structure: &Structure, atoms: &AtomIndex, pocket: &mut Pocket) {
    let residues = atoms.lining_residues(structure, pocket.center(), LINING_RADIUS);
    let druggability = druggability(pocket.size(), &residues);
    let knowledge = knowledge_score(&residues);
    debug!(
        residues = residues.len(),
        druggability,
        knowledge,
        "Scored geometric pocket."
    );
    pocket.set_geometric_scores(druggability, knowledge);
}

/// Boosts the consensus of pockets that fit the protein's functional class.
pub fn apply_protein_type(pockets: &mut [Pocket], protein_type: ProteinType) {
    for pocket in pockets.iter_mut() {
        let factor = match protein_type {
            ProteinType::Enzyme
                if pocket
                    .knowledge_score()
                    .is_some_and(|k| k > ENZYME_KNOWLEDGE_CUTOFF) =>
            {
                ENZYME_BOOST
            }
            ProteinType::Transporter if pocket.size() > TRANSPORTER_SIZE_CUTOFF => {
                TRANSPORTER_BOOST
            }
            ProteinType::Receptor
                if pocket
                    .druggability()
                    .is_some_and(|d| d > RECEPTOR_DRUGGABILITY_CUTOFF) =>
            {
                RECEPTOR_BOOST
            }
            _ => continue,
        };
        pocket.boost_consensus(factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::pocket::{DetectionMethod, PocketBuilder};
    use nalgebra::Point3;

    fn lining(names: &[&str]) -> Vec<LiningResidue> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| LiningResidue {
                chain_id: 'A',
                number: i as isize + 1,
                name: name.to_string(),
                amino_acid: name.parse().unwrap(),
            })
            .collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn druggability_peaks_at_ideal_volume_and_hydrophobicity() {
        let residues = lining(&["LEU", "ILE", "VAL", "SER", "THR"]);
        assert_close(druggability(62, &residues), (1.0 - 4.0 / 300.0 + 1.0) / 2.0);
    }

    #[test]
    fn druggability_is_zero_far_from_both_ideals() {
        assert_close(druggability(200, &lining(&["SER", "THR"])), 0.0);
        assert_close(druggability(0, &[]), 0.0);
    }

    #[test]
    fn knowledge_score_rewards_catalytic_triad() {
        // Mix (+1), pairs {HIS,ASP} and {SER,HIS} (+1), aromatic < 2, metal HIS+ASP = 2,
        // triad (+1.5).
        let residues = lining(&["ALA", "SER", "HIS", "ASP"]);
        assert_close(knowledge_score(&residues), 3.5);
    }

    #[test]
    fn knowledge_score_counts_metal_sites_and_heme_pattern() {
        // Mix (+1), {CYS,HIS} (+0.5), HIS with CYS (+1), metal count 3 (+1).
        let residues = lining(&["MET", "HIS", "CYS", "CYS"]);
        assert_close(knowledge_score(&residues), 3.5);
    }

    #[test]
    fn knowledge_score_detects_glycine_rich_loop() {
        let residues = lining(&["GLY", "GLY", "GLY", "LYS"]);
        assert_close(knowledge_score(&residues), 1.0);
        assert_close(knowledge_score(&lining(&["GLY", "GLY", "LYS"])), 0.0);
    }

    #[test]
    fn knowledge_score_of_empty_pocket_is_zero() {
        assert_eq!(knowledge_score(&[]), 0.0);
    }

    #[test]
    fn protein_type_boosts_only_matching_pockets() {
        let geometric = || {
            PocketBuilder::new(DetectionMethod::Geometric, Point3::origin())
                .size(400)
                .druggability(0.7)
                .knowledge_score(2.0)
                .build()
        };
        let energy = PocketBuilder::new(DetectionMethod::Energy, Point3::origin())
            .size(10)
            .raw_score(4.0)
            .build();

        let mut enzyme = vec![geometric(), energy.clone()];
        apply_protein_type(&mut enzyme, ProteinType::Enzyme);
        assert_close(enzyme[0].consensus_score(), 1.3);
        assert_close(enzyme[1].consensus_score(), 1.0);

        let mut transporter = vec![geometric(), energy.clone()];
        apply_protein_type(&mut transporter, ProteinType::Transporter);
        assert_close(transporter[0].consensus_score(), 1.2);
        assert_close(transporter[1].consensus_score(), 1.0);

        let mut receptor = vec![geometric()];
        apply_protein_type(&mut receptor, ProteinType::Receptor);
        assert_close(receptor[0].consensus_score(), 1.15);
        assert_close(receptor[0].final_score(), 1.15 * 3.0);

        let mut unknown = vec![geometric()];
        apply_protein_type(&mut unknown, ProteinType::Unknown);
        assert_close(unknown[0].consensus_score(), 1.0);
    }
}
