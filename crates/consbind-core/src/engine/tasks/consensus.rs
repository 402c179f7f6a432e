use crate::core::models::pocket::Pocket;
use tracing::{debug, info, instrument};

/// Consensus added to both pockets of every close pair.
const AGREEMENT_BONUS: f64 = 2.0;

/// Reconciles geometric and energy pockets into one ranked, non-overlapping list.
///
/// Every pair of pockets whose centers are closer than `distance_threshold` gains
/// consensus and shares its detection methods. Pockets are then ranked by final score
/// (ties keep construction order, geometric first) and suppressed against the ones
/// already accepted.
#[instrument(skip_all, name = "consensus_task")]
pub fn merge(geometric: Vec<Pocket>, energy: Vec<Pocket>, distance_threshold: f64) -> Vec<Pocket> {
    let mut pockets: Vec<Pocket> = geometric.into_iter().chain(energy).collect();
    if pockets.is_empty() {
        return pockets;
    }

    let mut agreements = 0usize;
    for i in 0..pockets.len() {
        for j in (i + 1)..pockets.len() {
            let (head, tail) = pockets.split_at_mut(j);
            let (first, second) = (&mut head[i], &mut tail[0]);
            if first.distance_to(second) < distance_threshold {
                first.add_consensus(AGREEMENT_BONUS);
                second.add_consensus(AGREEMENT_BONUS);
                first.absorb_methods(second.methods());
                second.absorb_methods(first.methods());
                agreements += 1;
            }
        }
    }
    debug!(agreements, "Applied pairwise consensus.");

    pockets.sort_by(|a, b| b.final_score().total_cmp(&a.final_score()));
    let merged = suppress(pockets, distance_threshold);
    info!(count = merged.len(), "Combined into consensus pockets.");
    merged
}

/// Non-maximum suppression over pockets already sorted best-first. A rejected pocket
/// hands its methods to the first accepted pocket it collides with.
pub fn suppress(pockets: Vec<Pocket>, distance_threshold: f64) -> Vec<Pocket> {
    let mut accepted: Vec<Pocket> = Vec::with_capacity(pockets.len());
    for pocket in pockets {
        match accepted
            .iter_mut()
            .find(|kept| kept.distance_to(&pocket) < distance_threshold)
        {
            Some(kept) => kept.absorb_methods(pocket.methods()),
            None => accepted.push(pocket),
        }
    }
    accepted
}
