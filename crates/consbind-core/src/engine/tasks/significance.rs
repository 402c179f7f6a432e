use crate::core::models::pocket::Pocket;
use crate::engine::cluster::{ClusterError, Criterion, Linkage, cluster};
use std::cmp::Ordering;
use thiserror::Error;
use tracing::{info, instrument, warn};

const MIN_POCKETS_FOR_CLUSTERING: usize = 3;
const MAX_SCORE_CLUSTERS: usize = 4;
const MIN_SCORE_SPREAD: f64 = 1e-6;

/// Which branch of the filter decided the final selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPath {
    Empty,
    Single,
    /// Natural break in the consensus scores, found with `clusters` score groups.
    Clustering { clusters: usize },
    /// Z-score cut, or the top pocket when the scores do not spread.
    StatisticalFallback,
    /// Both paths failed and every pocket was kept.
    Unfiltered,
}

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub pockets: Vec<Pocket>,
    pub path: FilterPath,
}

#[derive(Debug, Error)]
enum FilterError {
    #[error("score clustering failed: {0}")]
    Clustering(#[from] ClusterError),
    #[error("consensus scores are not finite")]
    NonFiniteScores,
}

fn by_rank(a: &Pocket, b: &Pocket) -> Ordering {
    b.consensus_score()
        .total_cmp(&a.consensus_score())
        .then_with(|| b.final_score().total_cmp(&a.final_score()))
}

/// Keeps the pockets whose consensus stands out, without a user threshold.
///
/// With three or more pockets the consensus scores are split into 2..=4 groups by
/// Ward clustering and the group above the widest break is kept. Fewer pockets, or no
/// usable break, fall back to keeping the scores above the mean.
#[instrument(skip_all, name = "significance_task")]
pub fn filter(mut pockets: Vec<Pocket>) -> FilterOutcome {
    pockets.sort_by(by_rank);

    let selection = match pockets.len() {
        0 => {
            warn!("No binding sites found.");
            return FilterOutcome {
                pockets,
                path: FilterPath::Empty,
            };
        }
        1 => {
            info!("Only one pocket found, keeping it.");
            return FilterOutcome {
                pockets,
                path: FilterPath::Single,
            };
        }
        _ => select(&pockets),
    };

    let (mut pockets, path) = match selection {
        Ok((keep, path)) => {
            let kept: Vec<Pocket> = pockets
                .into_iter()
                .zip(keep)
                .filter_map(|(pocket, keep)| keep.then_some(pocket))
                .collect();
            (kept, path)
        }
        Err(e) => {
            warn!(error = %e, "Significance filtering failed, keeping all pockets.");
            (pockets, FilterPath::Unfiltered)
        }
    };
    pockets.sort_by(by_rank);

    if let (Some(best), Some(worst)) = (pockets.first(), pockets.last()) {
        info!(
            count = pockets.len(),
            path = ?path,
            best = best.final_score(),
            worst = worst.final_score(),
            "Final pocket selection."
        );
    }
    FilterOutcome { pockets, path }
}

/// Returns a keep-mask over the ranked pockets and the path that produced it.
fn select(pockets: &[Pocket]) -> Result<(Vec<bool>, FilterPath), FilterError> {
    let scores: Vec<f64> = pockets.iter().map(Pocket::consensus_score).collect();
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(FilterError::NonFiniteScores);
    }

    if scores.len() >= MIN_POCKETS_FOR_CLUSTERING {
        match natural_break(&scores) {
            Ok(Some((keep, clusters))) => {
                info!(
                    kept = keep.iter().filter(|&&k| k).count(),
                    total = scores.len(),
                    clusters,
                    "Score clustering identified significant pockets."
                );
                return Ok((keep, FilterPath::Clustering { clusters }));
            }
            Ok(None) => info!("No break in consensus scores, using statistical fallback."),
            Err(e) => warn!(error = %e, "Score clustering failed, using statistical fallback."),
        }
    }

    Ok((above_mean(&scores), FilterPath::StatisticalFallback))
}

/// Ward clustering of the scores for k = 2..=min(4, n); the k with the widest gap between
/// the two best group means wins (first k on ties) and its best group is kept.
fn natural_break(scores: &[f64]) -> Result<Option<(Vec<bool>, usize)>, FilterError> {
    let points: Vec<[f64; 1]> = scores.iter().map(|&s| [s]).collect();
    let max_clusters = MAX_SCORE_CLUSTERS.min(scores.len());

    let mut best: Option<(f64, usize, Vec<usize>, usize)> = None;
    for k in 2..=max_clusters {
        let clustering = cluster(&points, Linkage::Ward, Criterion::MaxClusters(k))?;
        let means: Vec<f64> = clustering
            .groups()
            .iter()
            .map(|members| {
                members.iter().map(|&i| scores[i]).sum::<f64>() / members.len().max(1) as f64
            })
            .collect();

        let mut order: Vec<usize> = (0..means.len()).collect();
        order.sort_by(|&a, &b| means[b].total_cmp(&means[a]));
        let [top, second, ..] = order[..] else {
            continue;
        };
        let gap = means[top] - means[second];
        if best.as_ref().is_none_or(|(best_gap, ..)| gap > *best_gap) {
            best = Some((gap, k, clustering.labels().to_vec(), top));
        }
    }

    match best {
        Some((gap, k, labels, top)) if gap > 0.0 => {
            let keep = labels.iter().map(|&label| label == top).collect();
            Ok(Some((keep, k)))
        }
        _ => Ok(None),
    }
}

/// Keeps scores with a positive z-score; identical scores, or none above the mean, keep
/// only the first (best-ranked) pocket.
fn above_mean(scores: &[f64]) -> Vec<bool> {
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let std = (scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n).sqrt();

    let top_only = || -> Vec<bool> { (0..scores.len()).map(|i| i == 0).collect() };
    if std < MIN_SCORE_SPREAD {
        info!("Scores are nearly identical, keeping only the top pocket.");
        return top_only();
    }

    let keep: Vec<bool> = scores.iter().map(|s| (s - mean) / std > 0.0).collect();
    if keep.iter().any(|&k| k) {
        keep
    } else {
        top_only()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::pocket::{DetectionMethod, PocketBuilder};
    use nalgebra::Point3;

    fn pockets(consensus: &[f64]) -> Vec<Pocket> {
        consensus
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let center = Point3::new(i as f64 * 10.0, 0.0, 0.0);
                PocketBuilder::new(DetectionMethod::Geometric, center)
                    .size(10)
                    .raw_score(i as f64)
                    .consensus_score(c)
                    .build()
            })
            .collect()
    }

    fn consensus_of(outcome: &FilterOutcome) -> Vec<f64> {
        outcome
            .pockets
            .iter()
            .map(Pocket::consensus_score)
            .collect()
    }

    #[test]
    fn empty_and_single_inputs_pass_through() {
        let empty = filter(Vec::new());
        assert_eq!(empty.path, FilterPath::Empty);
        assert!(empty.pockets.is_empty());

        let single = filter(pockets(&[2.0]));
        assert_eq!(single.path, FilterPath::Single);
        assert_eq!(single.pockets.len(), 1);
    }

    #[test]
    fn two_pockets_use_the_statistical_fallback() {
        let outcome = filter(pockets(&[1.0, 3.0]));
        assert_eq!(outcome.path, FilterPath::StatisticalFallback);
        assert_eq!(consensus_of(&outcome), vec![3.0]);
    }

    #[test]
    fn identical_scores_keep_only_the_top_pocket() {
        let outcome = filter(pockets(&[1.0, 1.0, 1.0]));
        assert_eq!(outcome.path, FilterPath::StatisticalFallback);
        assert_eq!(outcome.pockets.len(), 1);
        // Ties on consensus are broken by final score, which grows with raw score here.
        assert_eq!(outcome.pockets[0].raw_score(), 2.0);
    }

    #[test]
    fn clear_break_keeps_the_high_consensus_group() {
        let outcome = filter(pockets(&[1.0, 5.0, 1.0, 5.0, 1.0]));
        assert_eq!(outcome.path, FilterPath::Clustering { clusters: 2 });
        assert_eq!(consensus_of(&outcome), vec![5.0, 5.0]);
        assert!(
            outcome.pockets[0].final_score() >= outcome.pockets[1].final_score()
        );
    }

    #[test]
    fn widest_gap_picks_the_cluster_count() {
        // k = 2 separates {9} from the rest; no larger k widens the top gap.
        let outcome = filter(pockets(&[1.0, 3.0, 3.2, 9.0]));
        assert_eq!(outcome.path, FilterPath::Clustering { clusters: 2 });
        assert_eq!(consensus_of(&outcome), vec![9.0]);
    }

    #[test]
    fn z_score_cut_keeps_above_mean_scores() {
        assert_eq!(
            above_mean(&[5.0, 1.0, 3.0, 4.0]),
            vec![true, false, false, true]
        );
        assert_eq!(above_mean(&[2.0, 2.0]), vec![true, false]);
    }
}
