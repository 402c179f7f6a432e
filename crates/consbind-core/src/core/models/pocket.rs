use nalgebra::Point3;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const CONSENSUS_WEIGHT: f64 = 3.0;
const RAW_SCORE_WEIGHT: f64 = 0.5;

/// The detector that produced (or corroborated) a pocket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DetectionMethod {
    Geometric,
    Energy,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown detection method: '{0}'")]
pub struct ParseDetectionMethodError(pub String);

impl FromStr for DetectionMethod {
    type Err = ParseDetectionMethodError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "geometric" => Ok(DetectionMethod::Geometric),
            "energy" => Ok(DetectionMethod::Energy),
            _ => Err(ParseDetectionMethodError(s.to_string())),
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DetectionMethod::Geometric => "geometric",
            DetectionMethod::Energy => "energy",
        })
    }
}

/// A predicted binding pocket.
///
/// The center and point cloud are fixed at construction. Score fields may only move
/// through the crate-internal mutators, each of which recomputes `final_score`, so the
/// derived value is never stale. `consensus_score` never decreases and the method set
/// only grows.
#[derive(Debug, Clone, PartialEq)]
pub struct Pocket {
    center: Point3<f64>,
    points: Vec<Point3<f64>>,
    size: usize,
    origin: DetectionMethod,
    methods: BTreeSet<DetectionMethod>,
    consensus_score: f64,
    raw_score: f64,
    druggability: Option<f64>,
    knowledge_score: Option<f64>,
    final_score: f64,
}

impl Pocket {
    pub fn center(&self) -> &Point3<f64> {
        &self.center
    }

    /// Member points that formed the pocket: cavity lattice points, energy hot spots, or
    /// the surface atom positions of a surface-fallback cluster.
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// The detector that originally produced this pocket.
    pub fn origin(&self) -> DetectionMethod {
        self.origin
    }

    pub fn methods(&self) -> &BTreeSet<DetectionMethod> {
        &self.methods
    }

    pub fn consensus_score(&self) -> f64 {
        self.consensus_score
    }

    pub fn raw_score(&self) -> f64 {
        self.raw_score
    }

    pub fn druggability(&self) -> Option<f64> {
        self.druggability
    }

    pub fn knowledge_score(&self) -> Option<f64> {
        self.knowledge_score
    }

    pub fn final_score(&self) -> f64 {
        self.final_score
    }

    pub fn distance_to(&self, other: &Pocket) -> f64 {
        nalgebra::distance(&self.center, &other.center)
    }

    pub(crate) fn add_consensus(&mut self, amount: f64) {
        if amount > 0.0 {
            self.consensus_score += amount;
            self.refresh();
        }
    }

    /// Multiplies the consensus score; factors below one are ignored.
    pub(crate) fn boost_consensus(&mut self, factor: f64) {
        if factor > 1.0 {
            self.consensus_score *= factor;
            self.refresh();
        }
    }

    pub(crate) fn absorb_methods(&mut self, methods: &BTreeSet<DetectionMethod>) {
        self.methods.extend(methods.iter().copied());
    }

    /// Stores druggability and knowledge scores and derives the geometric raw score
    /// (`0.2·size + druggability + 1.2·knowledge`).
    pub(crate) fn set_geometric_scores(&mut self, druggability: f64, knowledge: f64) {
        self.druggability = Some(druggability);
        self.knowledge_score = Some(knowledge);
        self.raw_score = 0.2 * self.size as f64 + druggability + 1.2 * knowledge;
        self.refresh();
    }

    fn refresh(&mut self) {
        self.final_score =
            self.consensus_score * CONSENSUS_WEIGHT + self.raw_score * RAW_SCORE_WEIGHT;
    }
}

/// Incrementally assembles a [`Pocket`].
///
/// ```ignore
/// let pocket = PocketBuilder::new(DetectionMethod::Energy, center)
///     .points(members)
///     .raw_score(mean_score)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct PocketBuilder {
    center: Point3<f64>,
    origin: DetectionMethod,
    points: Vec<Point3<f64>>,
    size: Option<usize>,
    methods: BTreeSet<DetectionMethod>,
    consensus_score: f64,
    raw_score: f64,
    druggability: Option<f64>,
    knowledge_score: Option<f64>,
}

impl PocketBuilder {
    pub fn new(origin: DetectionMethod, center: Point3<f64>) -> Self {
        Self {
            center,
            origin,
            points: Vec::new(),
            size: None,
            methods: BTreeSet::from([origin]),
            consensus_score: 1.0,
            raw_score: 0.0,
            druggability: None,
            knowledge_score: None,
        }
    }

    pub fn points(mut self, points: Vec<Point3<f64>>) -> Self {
        self.points = points;
        self
    }

    /// Overrides the size, which otherwise defaults to the number of points.
    pub fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn method(mut self, method: DetectionMethod) -> Self {
        self.methods.insert(method);
        self
    }

    /// Sets the starting consensus; values below one are clamped to one.
    pub fn consensus_score(mut self, consensus: f64) -> Self {
        self.consensus_score = consensus.max(1.0);
        self
    }

    pub fn raw_score(mut self, raw_score: f64) -> Self {
        self.raw_score = raw_score;
        self
    }

    pub fn druggability(mut self, druggability: f64) -> Self {
        self.druggability = Some(druggability);
        self
    }

    pub fn knowledge_score(mut self, knowledge: f64) -> Self {
        self.knowledge_score = Some(knowledge);
        self
    }

    pub fn build(self) -> Pocket {
        let size = self.size.unwrap_or(self.points.len());
        let mut pocket = Pocket {
            center: self.center,
            points: self.points,
            size,
            origin: self.origin,
            methods: self.methods,
            consensus_score: self.consensus_score,
            raw_score: self.raw_score,
            druggability: self.druggability,
            knowledge_score: self.knowledge_score,
            final_score: 0.0,
        };
        pocket.refresh();
        pocket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn builder_defaults_give_consensus_one_and_origin_method() {
        let pocket = PocketBuilder::new(DetectionMethod::Energy, Point3::new(1.0, 2.0, 3.0))
            .points(vec![Point3::origin(); 4])
            .raw_score(4.0)
            .build();
        assert_eq!(pocket.size(), 4);
        assert_eq!(pocket.consensus_score(), 1.0);
        assert_eq!(pocket.origin(), DetectionMethod::Energy);
        assert_eq!(pocket.methods().len(), 1);
        assert!(pocket.druggability().is_none());
        assert!(approx_eq(pocket.final_score(), 1.0 * 3.0 + 4.0 * 0.5));
    }

    #[test]
    fn explicit_size_overrides_point_count() {
        let pocket = PocketBuilder::new(DetectionMethod::Geometric, Point3::origin())
            .size(12)
            .build();
        assert_eq!(pocket.size(), 12);
        assert!(pocket.points().is_empty());
    }

    #[test]
    fn consensus_below_one_is_clamped() {
        let pocket = PocketBuilder::new(DetectionMethod::Geometric, Point3::origin())
            .consensus_score(0.2)
            .build();
        assert_eq!(pocket.consensus_score(), 1.0);
    }

    #[test]
    fn final_score_tracks_every_mutation() {
        let mut pocket = PocketBuilder::new(DetectionMethod::Geometric, Point3::origin())
            .size(10)
            .build();
        pocket.set_geometric_scores(0.5, 2.0);
        assert!(approx_eq(pocket.raw_score(), 2.0 + 0.5 + 2.4));
        assert!(approx_eq(pocket.final_score(), 3.0 + 4.9 * 0.5));

        pocket.add_consensus(2.0);
        assert!(approx_eq(pocket.final_score(), 9.0 + 4.9 * 0.5));

        pocket.boost_consensus(1.3);
        assert!(approx_eq(pocket.consensus_score(), 3.9));
        assert!(approx_eq(pocket.final_score(), 3.9 * 3.0 + 4.9 * 0.5));
    }

    #[test]
    fn consensus_never_decreases() {
        let mut pocket = PocketBuilder::new(DetectionMethod::Energy, Point3::origin()).build();
        pocket.add_consensus(-5.0);
        pocket.boost_consensus(0.5);
        assert_eq!(pocket.consensus_score(), 1.0);
    }

    #[test]
    fn absorb_methods_is_a_set_union() {
        let mut pocket = PocketBuilder::new(DetectionMethod::Geometric, Point3::origin()).build();
        let other = PocketBuilder::new(DetectionMethod::Energy, Point3::origin())
            .method(DetectionMethod::Geometric)
            .build();
        pocket.absorb_methods(other.methods());
        pocket.absorb_methods(other.methods());
        let methods: Vec<_> = pocket.methods().iter().copied().collect();
        assert_eq!(
            methods,
            vec![DetectionMethod::Geometric, DetectionMethod::Energy]
        );
    }

    #[test]
    fn detection_method_round_trips_through_strings() {
        assert_eq!("Geometric".parse(), Ok(DetectionMethod::Geometric));
        assert_eq!(DetectionMethod::Energy.to_string(), "energy");
        assert!("docking".parse::<DetectionMethod>().is_err());
    }
}
