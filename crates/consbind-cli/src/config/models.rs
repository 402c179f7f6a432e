use consbind::core::io::report::ReportOptions;
use consbind::engine::accessibility::ShrakeRupley;
use consbind::engine::config::PredictionConfig;
use std::path::PathBuf;
use std::time::Duration;

pub struct AppConfig {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub prediction: PredictionConfig,
    /// `None` when accessibility is disabled and surfaces come from neighbour counts.
    pub accessibility: Option<ShrakeRupley>,
    pub report: ReportOptions,
    pub time_limit: Option<Duration>,
}
