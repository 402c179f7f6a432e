use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::AppConfig;
use crate::cli::PredictArgs;
use crate::error::{CliError, Result};
use consbind::core::io::report::ReportOptions;
use consbind::engine::accessibility::ShrakeRupley;
use consbind::engine::config::{PredictionConfigBuilder, ProteinType};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Merges defaults, the optional TOML file, `-S` overrides and explicit flags, in
/// increasing order of precedence.
pub fn build_config(args: &PredictArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };

    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let detection = file_config.detection.take().unwrap_or_default();
    let protein_type: ProteinType = args
        .protein_type
        .as_deref()
        .or(detection.protein_type.as_deref())
        .unwrap_or(&defaults.protein_type)
        .parse()?;

    let mut builder = PredictionConfigBuilder::new()
        .probe_radius(
            args.probe_radius
                .or(detection.probe_radius)
                .unwrap_or(defaults.probe_radius),
        )
        .min_size(
            args.min_size
                .or(detection.min_size)
                .unwrap_or(defaults.min_size),
        )
        .grid_spacing(
            args.grid_spacing
                .or(detection.grid_spacing)
                .unwrap_or(defaults.grid_spacing),
        )
        .distance_threshold(
            args.distance_threshold
                .or(detection.distance_threshold)
                .unwrap_or(defaults.distance_threshold),
        )
        .protein_type(protein_type);
    if let Some(seed) = args.seed.or(detection.seed) {
        builder = builder.seed(seed);
    }
    let prediction = builder.build()?;

    let accessibility_file = file_config.accessibility.take().unwrap_or_default();
    let accessibility_enabled = !args.no_accessibility
        && accessibility_file
            .enabled
            .unwrap_or(defaults.accessibility);
    let accessibility = if accessibility_enabled {
        let service = ShrakeRupley {
            probe_radius: accessibility_file
                .probe_radius
                .unwrap_or(defaults.accessibility_probe_radius),
            sphere_points: accessibility_file
                .sphere_points
                .unwrap_or(defaults.sphere_points),
        };
        if !(service.probe_radius.is_finite() && service.probe_radius >= 0.0) {
            return Err(CliError::Config(format!(
                "`accessibility.probe-radius` must be a non-negative number, got {}",
                service.probe_radius
            )));
        }
        if service.sphere_points == 0 {
            return Err(CliError::Config(
                "`accessibility.sphere-points` must be at least 1".to_string(),
            ));
        }
        Some(service)
    } else {
        None
    };

    let output_file = file_config.output.take().unwrap_or_default();
    let output_dir = args
        .output
        .clone()
        .or(output_file.directory.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(&defaults.output_dir));
    let report = ReportOptions {
        pymol: args.pymol || output_file.pymol.unwrap_or(false),
        chimera: args.chimera || output_file.chimera.unwrap_or(false),
        csv: args.csv || output_file.csv.unwrap_or(false),
    };

    let batch_file = file_config.batch.take().unwrap_or_default();
    let time_limit = args
        .time_limit
        .or(batch_file.time_limit)
        .map(Duration::from_secs);

    Ok(AppConfig {
        input_path: args.input.clone(),
        output_dir,
        prediction,
        accessibility,
        report,
        time_limit,
    })
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| {
            CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value))
        })
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let key = key.trim();

        match key {
            "detection.probe-radius" => {
                config.detection.get_or_insert_with(Default::default).probe_radius =
                    Some(parse_value(key, value_str, "float")?);
            }
            "detection.min-size" => {
                config.detection.get_or_insert_with(Default::default).min_size =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "detection.grid-spacing" => {
                config.detection.get_or_insert_with(Default::default).grid_spacing =
                    Some(parse_value(key, value_str, "float")?);
            }
            "detection.distance-threshold" => {
                config
                    .detection
                    .get_or_insert_with(Default::default)
                    .distance_threshold = Some(parse_value(key, value_str, "float")?);
            }
            "detection.protein-type" => {
                config.detection.get_or_insert_with(Default::default).protein_type =
                    Some(value_str.trim().to_string());
            }
            "detection.seed" => {
                config.detection.get_or_insert_with(Default::default).seed =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "accessibility.enabled" => {
                config.accessibility.get_or_insert_with(Default::default).enabled =
                    Some(parse_value(key, value_str, "boolean")?);
            }
            "accessibility.probe-radius" => {
                config
                    .accessibility
                    .get_or_insert_with(Default::default)
                    .probe_radius = Some(parse_value(key, value_str, "float")?);
            }
            "accessibility.sphere-points" => {
                config
                    .accessibility
                    .get_or_insert_with(Default::default)
                    .sphere_points = Some(parse_value(key, value_str, "integer")?);
            }
            "output.directory" => {
                config.output.get_or_insert_with(Default::default).directory =
                    Some(value_str.trim().to_string());
            }
            "output.pymol" => {
                config.output.get_or_insert_with(Default::default).pymol =
                    Some(parse_value(key, value_str, "boolean")?);
            }
            "output.chimera" => {
                config.output.get_or_insert_with(Default::default).chimera =
                    Some(parse_value(key, value_str, "boolean")?);
            }
            "output.csv" => {
                config.output.get_or_insert_with(Default::default).csv =
                    Some(parse_value(key, value_str, "boolean")?);
            }
            "batch.time-limit" => {
                config.batch.get_or_insert_with(Default::default).time_limit =
                    Some(parse_value(key, value_str, "integer")?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use consbind::engine::config::ConfigError;
    use std::fs;
    use tempfile::tempdir;

    fn base_predict_args() -> PredictArgs {
        PredictArgs {
            input: PathBuf::from("protein.pdb"),
            output: None,
            config: None,
            probe_radius: None,
            min_size: None,
            grid_spacing: None,
            distance_threshold: None,
            protein_type: None,
            seed: None,
            no_accessibility: false,
            pymol: false,
            chimera: false,
            csv: false,
            time_limit: None,
            set_values: vec![],
        }
    }

    fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("consbind.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn defaults_apply_without_file_or_flags() {
        let app = build_config(&base_predict_args()).unwrap();
        let defaults = DefaultsConfig::default();

        assert_eq!(app.prediction.probe_radius, defaults.probe_radius);
        assert_eq!(app.prediction.min_size, defaults.min_size);
        assert_eq!(app.prediction.grid_spacing, defaults.grid_spacing);
        assert_eq!(
            app.prediction.distance_threshold,
            defaults.distance_threshold
        );
        assert_eq!(app.prediction.protein_type, ProteinType::Unknown);
        assert_eq!(app.prediction.seed, None);
        assert_eq!(app.output_dir, PathBuf::from("consbind_results"));
        assert_eq!(app.report, ReportOptions::default());
        assert_eq!(app.time_limit, None);
        let service = app.accessibility.unwrap();
        assert_eq!(service.sphere_points, defaults.sphere_points);
    }

    #[test]
    fn file_values_are_used() {
        let dir = tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
            [detection]
            grid-spacing = 1.5
            protein-type = "receptor"
            seed = 11

            [accessibility]
            sphere-points = 50

            [output]
            directory = "from-file"
            chimera = true

            [batch]
            time-limit = 30
            "#,
        );
        let mut args = base_predict_args();
        args.config = Some(path);

        let app = build_config(&args).unwrap();
        assert_eq!(app.prediction.grid_spacing, 1.5);
        assert_eq!(app.prediction.protein_type, ProteinType::Receptor);
        assert_eq!(app.prediction.seed, Some(11));
        assert_eq!(app.accessibility.unwrap().sphere_points, 50);
        assert_eq!(app.output_dir, PathBuf::from("from-file"));
        assert!(app.report.chimera && !app.report.pymol);
        assert_eq!(app.time_limit, Some(Duration::from_secs(30)));
    }

    #[test]
    fn cli_flags_override_file_values() {
        let dir = tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
            [detection]
            grid-spacing = 1.5
            min-size = 9
            protein-type = "receptor"

            [output]
            directory = "from-file"
            "#,
        );
        let mut args = base_predict_args();
        args.config = Some(path);
        args.grid_spacing = Some(0.8);
        args.protein_type = Some("enzyme".to_string());
        args.output = Some(PathBuf::from("from-cli"));
        args.no_accessibility = true;

        let app = build_config(&args).unwrap();
        assert_eq!(app.prediction.grid_spacing, 0.8);
        assert_eq!(app.prediction.min_size, 9);
        assert_eq!(app.prediction.protein_type, ProteinType::Enzyme);
        assert_eq!(app.output_dir, PathBuf::from("from-cli"));
        assert!(app.accessibility.is_none());
    }

    #[test]
    fn set_values_override_file_values() {
        let dir = tempdir().unwrap();
        let path = write_config(&dir, "[detection]\ndistance-threshold = 4.0\n");
        let mut args = base_predict_args();
        args.config = Some(path);
        args.set_values = vec![
            "detection.distance-threshold=7.5".to_string(),
            "accessibility.enabled=false".to_string(),
            "output.csv=true".to_string(),
        ];

        let app = build_config(&args).unwrap();
        assert_eq!(app.prediction.distance_threshold, 7.5);
        assert!(app.accessibility.is_none());
        assert!(app.report.csv);
    }

    #[test]
    fn malformed_set_values_are_rejected() {
        let mut args = base_predict_args();
        args.set_values = vec!["detection.min-size".to_string()];
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));

        args.set_values = vec!["detection.min-size=many".to_string()];
        assert!(matches!(
            build_config(&args),
            Err(CliError::Config(msg)) if msg.contains("integer")
        ));

        args.set_values = vec!["scoring.weight=1".to_string()];
        assert!(matches!(
            build_config(&args),
            Err(CliError::Config(msg)) if msg.contains("Unsupported")
        ));
    }

    #[test]
    fn invalid_detection_parameters_are_rejected() {
        let mut args = base_predict_args();
        args.grid_spacing = Some(-1.0);
        assert!(matches!(
            build_config(&args),
            Err(CliError::InvalidParameter(ConfigError::InvalidParameter {
                name: "grid_spacing",
                ..
            }))
        ));

        let mut args = base_predict_args();
        args.protein_type = Some("kinase".to_string());
        assert!(matches!(
            build_config(&args),
            Err(CliError::InvalidParameter(ConfigError::UnknownProteinType(_)))
        ));
    }
}
