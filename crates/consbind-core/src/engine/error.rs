use thiserror::Error;

use super::cluster::ClusterError;
use super::config::ConfigError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Clustering failed during {phase}: {source}")]
    Clustering {
        phase: &'static str,
        source: ClusterError,
    },
}
