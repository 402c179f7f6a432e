//! Distance-based clustering shared by the scanners and the significance filter.
//!
//! Hierarchical clustering runs the nearest-neighbour-chain algorithm over a condensed
//! distance matrix with Lance–Williams updates, then cuts the resulting dendrogram either
//! at a distance or at a target cluster count. Single linkage with a distance cutoff
//! skips the dendrogram entirely and joins every pair closer than the cutoff.

use crate::core::spatial::SpatialIndex;
use nalgebra::Point3;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    Single,
    Average,
    Ward,
}

/// Where to cut the dendrogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Criterion {
    /// Members of a cluster are joined by merges no higher than this distance.
    Distance(f64),
    /// Exactly `min(k, n)` clusters.
    MaxClusters(usize),
}

#[derive(Debug, Error, PartialEq)]
pub enum ClusterError {
    #[error("Point {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },
    #[error("Invalid clustering criterion: {0}")]
    InvalidCriterion(String),
}

/// Flat cluster labels, numbered from zero in order of first appearance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Clustering {
    labels: Vec<usize>,
    num_clusters: usize,
}

impl Clustering {
    fn from_roots(roots: Vec<usize>) -> Self {
        let mut mapping = vec![usize::MAX; roots.len()];
        let mut num_clusters = 0;
        let labels = roots
            .into_iter()
            .map(|root| {
                if mapping[root] == usize::MAX {
                    mapping[root] = num_clusters;
                    num_clusters += 1;
                }
                mapping[root]
            })
            .collect();
        Self {
            labels,
            num_clusters,
        }
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Member indices of each cluster, indexed by label.
    pub fn groups(&self) -> Vec<Vec<usize>> {
        let mut groups = vec![Vec::new(); self.num_clusters];
        for (index, &label) in self.labels.iter().enumerate() {
            groups[label].push(index);
        }
        groups
    }
}

struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }

    fn into_clustering(mut self) -> Clustering {
        let roots = (0..self.parent.len()).map(|i| self.find(i)).collect();
        Clustering::from_roots(roots)
    }
}

fn squared_distance<const D: usize>(a: &[f64; D], b: &[f64; D]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn validate<const D: usize>(points: &[[f64; D]]) -> Result<(), ClusterError> {
    match points
        .iter()
        .position(|p| p.iter().any(|c| !c.is_finite()))
    {
        Some(index) => Err(ClusterError::NonFiniteCoordinate { index }),
        None => Ok(()),
    }
}

/// Partitions `points` with the given linkage and cut criterion.
///
/// Zero points yield an empty clustering and a single point yields one singleton
/// cluster, independent of the criterion.
pub fn cluster<const D: usize>(
    points: &[[f64; D]],
    linkage: Linkage,
    criterion: Criterion,
) -> Result<Clustering, ClusterError> {
    match criterion {
        Criterion::Distance(t) if !(t.is_finite() && t >= 0.0) => {
            return Err(ClusterError::InvalidCriterion(format!(
                "distance cutoff must be a non-negative finite number, got {}",
                t
            )));
        }
        Criterion::MaxClusters(0) => {
            return Err(ClusterError::InvalidCriterion(
                "cluster count must be at least 1".into(),
            ));
        }
        _ => {}
    }
    validate(points)?;

    let n = points.len();
    if n <= 1 {
        return Ok(Clustering::from_roots(vec![0; n]));
    }

    if let (Linkage::Single, Criterion::Distance(t)) = (linkage, criterion) {
        return Ok(single_linkage_within(points, t));
    }

    let merges = nn_chain(points, linkage);
    let mut sets = DisjointSet::new(n);
    match criterion {
        Criterion::Distance(t) => {
            for &(a, b, _) in merges.iter().take_while(|m| m.2 <= t) {
                sets.union(a, b);
            }
        }
        Criterion::MaxClusters(k) => {
            let merges_to_apply = n - k.min(n);
            for &(a, b, _) in merges.iter().take(merges_to_apply) {
                sets.union(a, b);
            }
        }
    }
    Ok(sets.into_clustering())
}

/// Connected components of the graph joining points no farther apart than `cutoff`.
fn single_linkage_within<const D: usize>(points: &[[f64; D]], cutoff: f64) -> Clustering {
    let n = points.len();
    let cutoff_sq = cutoff * cutoff;
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| points[a][0].total_cmp(&points[b][0]));

    let mut sets = DisjointSet::new(n);
    for (pos, &i) in order.iter().enumerate() {
        for &j in &order[pos + 1..] {
            if points[j][0] - points[i][0] > cutoff {
                break;
            }
            if squared_distance(&points[i], &points[j]) <= cutoff_sq {
                sets.union(i, j);
            }
        }
    }
    sets.into_clustering()
}

/// Condensed upper-triangular distance matrix.
struct CondensedMatrix {
    n: usize,
    data: Vec<f64>,
}

impl CondensedMatrix {
    fn new<const D: usize>(points: &[[f64; D]], squared: bool) -> Self {
        let n = points.len();
        let mut data = Vec::with_capacity(n * (n - 1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                let d = squared_distance(&points[i], &points[j]);
                data.push(if squared { d } else { d.sqrt() });
            }
        }
        Self { n, data }
    }

    #[inline]
    fn index(&self, i: usize, j: usize) -> usize {
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        self.n * i - i * (i + 1) / 2 + (j - i - 1)
    }

    #[inline]
    fn get(&self, i: usize, j: usize) -> f64 {
        self.data[self.index(i, j)]
    }

    #[inline]
    fn set(&mut self, i: usize, j: usize, value: f64) {
        let idx = self.index(i, j);
        self.data[idx] = value;
    }
}

/// Builds the dendrogram as `(absorbed, survivor, height)` merges sorted by height.
/// Every cluster is represented by one of its member indices.
fn nn_chain<const D: usize>(points: &[[f64; D]], linkage: Linkage) -> Vec<(usize, usize, f64)> {
    let n = points.len();
    let ward = linkage == Linkage::Ward;
    let mut dist = CondensedMatrix::new(points, ward);
    let mut active = vec![true; n];
    let mut size = vec![1usize; n];
    let mut chain: Vec<usize> = Vec::with_capacity(n);
    let mut merges = Vec::with_capacity(n - 1);

    while merges.len() < n - 1 {
        if chain.is_empty() {
            if let Some(first) = active.iter().position(|&a| a) {
                chain.push(first);
            }
        }

        let (a, b) = loop {
            let a = chain[chain.len() - 1];
            let previous = (chain.len() >= 2).then(|| chain[chain.len() - 2]);
            let mut best = previous;
            let mut best_distance = previous.map_or(f64::INFINITY, |p| dist.get(a, p));
            for x in (0..n).filter(|&x| active[x] && x != a) {
                let d = dist.get(a, x);
                if d < best_distance {
                    best = Some(x);
                    best_distance = d;
                }
            }
            match best {
                Some(b) if Some(b) == previous => break (a, b),
                Some(b) => chain.push(b),
                None => break (a, a),
            }
        };
        if a == b {
            break;
        }
        chain.truncate(chain.len() - 2);

        let height = dist.get(a, b);
        let (size_a, size_b) = (size[a] as f64, size[b] as f64);
        for x in (0..n).filter(|&x| active[x] && x != a && x != b) {
            let d_ax = dist.get(a, x);
            let d_bx = dist.get(b, x);
            let updated = match linkage {
                Linkage::Single => d_ax.min(d_bx),
                Linkage::Average => (size_a * d_ax + size_b * d_bx) / (size_a + size_b),
                Linkage::Ward => {
                    let size_x = size[x] as f64;
                    ((size_a + size_x) * d_ax + (size_b + size_x) * d_bx - size_x * height)
                        / (size_a + size_b + size_x)
                }
            };
            dist.set(b, x, updated);
        }
        active[a] = false;
        size[b] += size[a];
        merges.push((a, b, if ward { height.max(0.0).sqrt() } else { height }));
    }

    merges.sort_by(|x, y| x.2.total_cmp(&y.2));
    merges
}

/// Density-based clustering: points with at least `min_samples` neighbours within `eps`
/// (counting themselves) seed clusters that grow through neighbouring core points.
/// Noise points are labelled `None`.
pub fn dbscan(
    points: &[Point3<f64>],
    eps: f64,
    min_samples: usize,
) -> Result<Vec<Option<usize>>, ClusterError> {
    if !(eps.is_finite() && eps > 0.0) {
        return Err(ClusterError::InvalidCriterion(format!(
            "eps must be a positive finite number, got {}",
            eps
        )));
    }
    if let Some(index) = points
        .iter()
        .position(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
    {
        return Err(ClusterError::NonFiniteCoordinate { index });
    }

    let index = SpatialIndex::new(points);
    let neighbours: Vec<Vec<usize>> = points
        .iter()
        .map(|p| {
            index.within(p, eps).into_iter().map(|(i, _)| i).collect()
        })
        .collect();
    let is_core: Vec<bool> = neighbours.iter().map(|n| n.len() >= min_samples).collect();

    let mut labels: Vec<Option<usize>> = vec![None; points.len()];
    let mut next_label = 0;
    for seed in 0..points.len() {
        if labels[seed].is_some() || !is_core[seed] {
            continue;
        }
        labels[seed] = Some(next_label);
        let mut stack = vec![seed];
        while let Some(current) = stack.pop() {
            for &neighbour in &neighbours[current] {
                if labels[neighbour].is_none() {
                    labels[neighbour] = Some(next_label);
                    if is_core[neighbour] {
                        stack.push(neighbour);
                    }
                }
            }
        }
        next_label += 1;
    }
    Ok(labels)
}
