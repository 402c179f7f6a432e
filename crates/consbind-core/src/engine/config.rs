use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_PROBE_RADIUS: f64 = 1.4;
pub const DEFAULT_MIN_SIZE: usize = 5;
pub const DEFAULT_GRID_SPACING: f64 = 1.0;
pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 5.0;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Unknown protein type '{0}' (expected enzyme, receptor, transporter or unknown)")]
    UnknownProteinType(String),
}

/// Functional class of the protein, used to bias pocket ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProteinType {
    Enzyme,
    Receptor,
    Transporter,
    #[default]
    Unknown,
}

impl FromStr for ProteinType {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enzyme" => Ok(ProteinType::Enzyme),
            "receptor" => Ok(ProteinType::Receptor),
            "transporter" => Ok(ProteinType::Transporter),
            "unknown" | "" => Ok(ProteinType::Unknown),
            _ => Err(ConfigError::UnknownProteinType(s.to_string())),
        }
    }
}

impl fmt::Display for ProteinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProteinType::Enzyme => "enzyme",
            ProteinType::Receptor => "receptor",
            ProteinType::Transporter => "transporter",
            ProteinType::Unknown => "unknown",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionConfig {
    /// Probe radius in Å for the cavity enclosure test.
    pub probe_radius: f64,
    /// Minimum number of cavity points per geometric pocket.
    pub min_size: usize,
    /// Lattice spacing in Å; the energy scan uses twice this value.
    pub grid_spacing: f64,
    /// Center distance in Å below which two pockets are considered the same site.
    pub distance_threshold: f64,
    pub protein_type: ProteinType,
    /// Seed for grid subsampling and concavity directions; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            probe_radius: DEFAULT_PROBE_RADIUS,
            min_size: DEFAULT_MIN_SIZE,
            grid_spacing: DEFAULT_GRID_SPACING,
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            protein_type: ProteinType::Unknown,
            seed: None,
        }
    }
}

#[derive(Default)]
pub struct PredictionConfigBuilder {
    probe_radius: Option<f64>,
    min_size: Option<usize>,
    grid_spacing: Option<f64>,
    distance_threshold: Option<f64>,
    protein_type: Option<ProteinType>,
    seed: Option<u64>,
}

impl PredictionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe_radius(mut self, radius: f64) -> Self {
        self.probe_radius = Some(radius);
        self
    }
    pub fn min_size(mut self, size: usize) -> Self {
        self.min_size = Some(size);
        self
    }
    pub fn grid_spacing(mut self, spacing: f64) -> Self {
        self.grid_spacing = Some(spacing);
        self
    }
    pub fn distance_threshold(mut self, threshold: f64) -> Self {
        self.distance_threshold = Some(threshold);
        self
    }
    pub fn protein_type(mut self, protein_type: ProteinType) -> Self {
        self.protein_type = Some(protein_type);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<PredictionConfig, ConfigError> {
        let defaults = PredictionConfig::default();
        let config = PredictionConfig {
            probe_radius: self.probe_radius.unwrap_or(defaults.probe_radius),
            min_size: self.min_size.unwrap_or(defaults.min_size),
            grid_spacing: self.grid_spacing.unwrap_or(defaults.grid_spacing),
            distance_threshold: self
                .distance_threshold
                .unwrap_or(defaults.distance_threshold),
            protein_type: self.protein_type.unwrap_or(defaults.protein_type),
            seed: self.seed,
        };
        config.validate()?;
        Ok(config)
    }
}

fn require_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("must be a positive finite number, got {}", value),
        })
    }
}

impl PredictionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("probe_radius", self.probe_radius)?;
        require_positive("grid_spacing", self.grid_spacing)?;
        require_positive("distance_threshold", self.distance_threshold)?;
        if self.min_size == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "min_size",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_without_overrides_matches_defaults() {
        let config = PredictionConfigBuilder::new().build().unwrap();
        assert_eq!(config, PredictionConfig::default());
        assert_eq!(config.probe_radius, 1.4);
        assert_eq!(config.min_size, 5);
        assert_eq!(config.grid_spacing, 1.0);
        assert_eq!(config.distance_threshold, 5.0);
        assert_eq!(config.protein_type, ProteinType::Unknown);
        assert!(config.seed.is_none());
    }

    #[test]
    fn builder_applies_overrides() {
        let config = PredictionConfigBuilder::new()
            .probe_radius(1.6)
            .min_size(3)
            .grid_spacing(0.8)
            .distance_threshold(6.0)
            .protein_type(ProteinType::Enzyme)
            .seed(42)
            .build()
            .unwrap();
        assert_eq!(config.probe_radius, 1.6);
        assert_eq!(config.min_size, 3);
        assert_eq!(config.grid_spacing, 0.8);
        assert_eq!(config.distance_threshold, 6.0);
        assert_eq!(config.protein_type, ProteinType::Enzyme);
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn builder_rejects_non_positive_values() {
        let err = PredictionConfigBuilder::new().grid_spacing(0.0).build();
        assert!(matches!(
            err,
            Err(ConfigError::InvalidParameter { name: "grid_spacing", .. })
        ));
        let nan_probe = PredictionConfigBuilder::new().probe_radius(f64::NAN);
        assert!(nan_probe.build().is_err());
        assert!(PredictionConfigBuilder::new().min_size(0).build().is_err());
    }

    #[test]
    fn protein_type_parses_case_insensitively() {
        assert_eq!("Enzyme".parse(), Ok(ProteinType::Enzyme));
        assert_eq!("TRANSPORTER".parse(), Ok(ProteinType::Transporter));
        assert_eq!("".parse(), Ok(ProteinType::Unknown));
        assert!(matches!(
            "kinase".parse::<ProteinType>(),
            Err(ConfigError::UnknownProteinType(_))
        ));
        assert_eq!(ProteinType::Receptor.to_string(), "receptor");
    }
}
