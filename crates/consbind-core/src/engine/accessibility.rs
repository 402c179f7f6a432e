//! Per-residue relative solvent accessibility.
//!
//! The surface classifier prefers accessibility data but never depends on it: the
//! outcome of asking a service is an explicit [`Accessibility`] value, and both
//! `Unavailable` and `Failed` lead to the neighbour-count fallback.

use crate::core::models::ids::ResidueId;
use crate::core::models::structure::Structure;
use crate::core::spatial::SpatialIndex;
use crate::core::utils::geometry::fibonacci_sphere;
use nalgebra::{Point3, Vector3};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Relative exposed-surface fraction per standard amino-acid residue.
pub type ResidueExposure = HashMap<ResidueId, f64>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AccessibilityError {
    #[error("No accessibility service is configured")]
    Unavailable,
    #[error("Structure contains no standard amino-acid heavy atoms")]
    NoProteinAtoms,
    #[error("Accessibility service '{service}' failed: {message}")]
    Service { service: String, message: String },
}

pub trait AccessibilityService: Send + Sync {
    fn name(&self) -> &str;

    fn relative_exposure(
        &self,
        structure: &Structure,
    ) -> Result<ResidueExposure, AccessibilityError>;
}

/// Outcome of consulting an accessibility service.
#[derive(Debug, Clone, PartialEq)]
pub enum Accessibility {
    Computed(ResidueExposure),
    Unavailable,
    Failed(AccessibilityError),
}

impl Accessibility {
    pub fn evaluate(service: &dyn AccessibilityService, structure: &Structure) -> Self {
        match service.relative_exposure(structure) {
            Ok(exposure) => {
                debug!(
                    service = service.name(),
                    residues = exposure.len(),
                    "Computed residue accessibility."
                );
                Accessibility::Computed(exposure)
            }
            Err(AccessibilityError::Unavailable) => Accessibility::Unavailable,
            Err(err) => {
                warn!(
                    service = service.name(),
                    error = %err,
                    "Accessibility computation failed; falling back to neighbour counts."
                );
                Accessibility::Failed(err)
            }
        }
    }

    pub fn exposure(&self) -> Option<&ResidueExposure> {
        match self {
            Accessibility::Computed(exposure) => Some(exposure),
            _ => None,
        }
    }
}

/// Stand-in used when accessibility is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAccessibility;

impl AccessibilityService for NoAccessibility {
    fn name(&self) -> &str {
        "none"
    }

    fn relative_exposure(
        &self,
        _structure: &Structure,
    ) -> Result<ResidueExposure, AccessibilityError> {
        Err(AccessibilityError::Unavailable)
    }
}

fn element_radius(element: &str) -> f64 {
    match element {
        "C" => 1.7,
        "N" => 1.55,
        "O" => 1.52,
        "S" => 1.8,
        "SE" => 1.9,
        _ => 1.8,
    }
}

/// Shrake–Rupley numerical surface: each atom's probe-inflated sphere is sampled with
/// golden-spiral points and the unburied fraction scales its sphere area.
#[derive(Debug, Clone)]
pub struct ShrakeRupley {
    pub probe_radius: f64,
    pub sphere_points: usize,
}

impl Default for ShrakeRupley {
    fn default() -> Self {
        Self {
            probe_radius: 1.4,
            sphere_points: 100,
        }
    }
}

impl ShrakeRupley {
    fn atom_area(
        &self,
        index: usize,
        centers: &[Point3<f64>],
        radii: &[f64],
        max_radius: f64,
        spatial: &SpatialIndex,
        sphere: &[Vector3<f64>],
    ) -> f64 {
        let center = centers[index];
        let radius = radii[index];
        let neighbours: Vec<usize> = spatial
            .within(&center, radius + max_radius)
            .into_iter()
            .map(|(j, _)| j)
            .filter(|&j| j != index)
            .collect();

        let exposed = sphere
            .iter()
            .filter(|direction| {
                let probe = center + *direction * radius;
                neighbours.iter().all(|&j| {
                    nalgebra::distance_squared(&probe, &centers[j]) >= radii[j] * radii[j]
                })
            })
            .count();
        4.0 * std::f64::consts::PI * radius * radius * exposed as f64 / sphere.len() as f64
    }
}

impl AccessibilityService for ShrakeRupley {
    fn name(&self) -> &str {
        "shrake-rupley"
    }

    fn relative_exposure(
        &self,
        structure: &Structure,
    ) -> Result<ResidueExposure, AccessibilityError> {
        let mut centers = Vec::new();
        let mut radii = Vec::new();
        let mut owners = Vec::new();
        for (_, atom) in structure.heavy_atoms() {
            let is_protein = structure
                .residue(atom.residue_id)
                .is_some_and(|r| r.is_standard_amino_acid());
            if is_protein {
                centers.push(atom.position);
                radii.push(element_radius(&atom.element) + self.probe_radius);
                owners.push(atom.residue_id);
            }
        }
        if centers.is_empty() {
            return Err(AccessibilityError::NoProteinAtoms);
        }
        if self.sphere_points == 0 {
            return Err(AccessibilityError::Service {
                service: self.name().to_string(),
                message: "sphere_points must be positive".into(),
            });
        }

        let sphere = fibonacci_sphere(self.sphere_points);
        let spatial = SpatialIndex::new(&centers);
        let max_radius = radii.iter().copied().fold(0.0, f64::max);

        #[cfg(not(feature = "parallel"))]
        let areas: Vec<f64> = (0..centers.len())
            .map(|i| {
                self.atom_area(i, &centers, &radii, max_radius, &spatial, &sphere)
            })
            .collect();
        #[cfg(feature = "parallel")]
        let areas: Vec<f64> = (0..centers.len())
            .into_par_iter()
            .map(|i| {
                self.atom_area(i, &centers, &radii, max_radius, &spatial, &sphere)
            })
            .collect();

        let mut totals: HashMap<ResidueId, f64> = HashMap::new();
        for (owner, area) in owners.iter().zip(areas) {
            *totals.entry(*owner).or_insert(0.0) += area;
        }

        Ok(totals
            .into_iter()
            .filter_map(|(residue_id, area)| {
                let amino_acid = structure.residue(residue_id)?.amino_acid()?;
                Some((residue_id, area / amino_acid.max_accessible_area()))
            })
            .collect())
    }
}
