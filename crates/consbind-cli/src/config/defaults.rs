use consbind::engine::config::{
    DEFAULT_DISTANCE_THRESHOLD, DEFAULT_GRID_SPACING, DEFAULT_MIN_SIZE, DEFAULT_PROBE_RADIUS,
};

pub struct DefaultsConfig {
    pub probe_radius: f64,
    pub min_size: usize,
    pub grid_spacing: f64,
    pub distance_threshold: f64,
    pub protein_type: String,
    pub accessibility: bool,
    pub accessibility_probe_radius: f64,
    pub sphere_points: usize,
    pub output_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            probe_radius: DEFAULT_PROBE_RADIUS,
            min_size: DEFAULT_MIN_SIZE,
            grid_spacing: DEFAULT_GRID_SPACING,
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            protein_type: "unknown".to_string(),
            accessibility: true,
            accessibility_probe_radius: 1.4,
            sphere_points: 100,
            output_dir: "consbind_results".to_string(),
        }
    }
}
