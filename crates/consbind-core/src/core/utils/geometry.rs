use nalgebra::{Point3, Vector3};
use rand::Rng;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl BoundingBox {
    /// Smallest box containing every point; `None` for an empty input.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| {
            (min.inf(p), max.sup(p))
        });
        Some(Self { min, max })
    }

    pub fn padded(&self, padding: f64) -> Self {
        let pad = Vector3::repeat(padding);
        Self {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    pub fn extent(&self) -> Vector3<f64> {
        self.max - self.min
    }
}

/// A regular lattice `min + k·spacing` on each axis, excluding the upper bound.
///
/// Points are addressed by a linear index with the z axis varying fastest, so a lattice
/// of millions of points never has to be materialised before sampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lattice {
    origin: Point3<f64>,
    spacing: f64,
    dims: [usize; 3],
}

impl Lattice {
    pub fn new(bounds: &BoundingBox, spacing: f64) -> Self {
        let extent = bounds.extent();
        let count = |span: f64| {
            if spacing > 0.0 && span > 0.0 {
                (span / spacing).ceil() as usize
            } else {
                0
            }
        };
        Self {
            origin: bounds.min,
            spacing,
            dims: [count(extent.x), count(extent.y), count(extent.z)],
        }
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn point(&self, index: usize) -> Point3<f64> {
        let [_, ny, nz] = self.dims;
        let k = index % nz;
        let j = (index / nz) % ny;
        let i = index / (ny * nz);
        self.origin + Vector3::new(i as f64, j as f64, k as f64) * self.spacing
    }

    /// Uniformly samples up to `max_points` distinct lattice points without replacement.
    /// Every point is returned, in index order, when the lattice is small enough.
    pub fn sample(&self, max_points: usize, rng: &mut impl Rng) -> Vec<Point3<f64>> {
        let total = self.len();
        if total <= max_points {
            return (0..total).map(|index| self.point(index)).collect();
        }
        rand::seq::index::sample(rng, total, max_points)
            .into_iter()
            .map(|index| self.point(index))
            .collect()
    }
}

pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / points.len() as f64))
}

/// Quasi-uniform points on the unit sphere (golden-section spiral).
pub fn fibonacci_sphere(n: usize) -> Vec<Vector3<f64>> {
    let golden_angle = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
    (0..n)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
            let r = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden_angle * i as f64;
            Vector3::new(r * theta.cos(), y, r * theta.sin())
        })
        .collect()
}

/// Uniformly distributed random direction, by rejection sampling inside the unit ball.
pub fn random_unit_vector(rng: &mut impl Rng) -> Vector3<f64> {
    loop {
        let v: Vector3<f64> = Vector3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        );
        let norm_sq = v.norm_squared();
        if norm_sq > 1e-6 && norm_sq <= 1.0 {
            return v / norm_sq.sqrt();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn bounding_box_of_empty_input_is_none() {
        assert!(
            BoundingBox::from_points(&Vec::<Point3<f64>>::new()).is_none()
        );
    }

    #[test]
    fn bounding_box_covers_points_and_pads() {
        let points = [Point3::new(1.0, -2.0, 3.0), Point3::new(-1.0, 4.0, 0.0)];
        let bounds = BoundingBox::from_points(&points).unwrap();
        assert_eq!(bounds.min, Point3::new(-1.0, -2.0, 0.0));
        assert_eq!(bounds.max, Point3::new(1.0, 4.0, 3.0));
        let padded = bounds.padded(10.0);
        assert_eq!(padded.min, Point3::new(-11.0, -12.0, -10.0));
        assert_eq!(padded.extent(), Vector3::new(22.0, 26.0, 23.0));
    }

    #[test]
    fn lattice_counts_follow_half_open_ranges() {
        let bounds = BoundingBox {
            min: Point3::origin(),
            max: Point3::new(3.0, 2.5, 1.0),
        };
        let lattice = Lattice::new(&bounds, 1.0);
        assert_eq!(lattice.dims(), [3, 3, 1]);
        assert_eq!(lattice.len(), 9);
        assert_eq!(lattice.point(0), Point3::origin());
        assert_eq!(lattice.point(1), Point3::new(0.0, 1.0, 0.0));
        assert_eq!(lattice.point(8), Point3::new(2.0, 2.0, 0.0));
    }

    #[test]
    fn degenerate_lattice_is_empty() {
        let point = Point3::new(1.0, 1.0, 1.0);
        let bounds = BoundingBox {
            min: point,
            max: point,
        };
        assert!(Lattice::new(&bounds, 1.0).is_empty());
    }

    #[test]
    fn sample_returns_distinct_points_bounded_by_limit() {
        let bounds = BoundingBox {
            min: Point3::origin(),
            max: Point3::new(20.0, 20.0, 20.0),
        };
        let lattice = Lattice::new(&bounds, 1.0);
        let mut rng = StdRng::seed_from_u64(7);
        let sample = lattice.sample(500, &mut rng);
        assert_eq!(sample.len(), 500);
        let unique: HashSet<_> = sample
            .iter()
            .map(|p| (p.x as i64, p.y as i64, p.z as i64))
            .collect();
        assert_eq!(unique.len(), 500);

        let small = lattice.sample(100_000, &mut rng);
        assert_eq!(small.len(), 8000);
    }

    #[test]
    fn centroid_averages_points() {
        let points = [Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 4.0, 6.0)];
        assert_eq!(centroid(&points), Some(Point3::new(1.0, 2.0, 3.0)));
        assert_eq!(centroid(&[]), None);
    }

    #[test]
    fn sphere_and_random_directions_are_unit_length() {
        for v in fibonacci_sphere(50) {
            assert!((v.norm() - 1.0).abs() < 1e-9);
        }
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            assert!((random_unit_vector(&mut rng).norm() - 1.0).abs() < 1e-9);
        }
    }
}
