use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "ConSBind contributors",
    version,
    about = "ConSBind CLI - Consensus ligand-binding pocket prediction.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel grid evaluation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Predict ligand-binding pockets for one structure or a directory of structures.
    Predict(PredictArgs),
}

/// Arguments for the `predict` subcommand.
#[derive(Args, Debug)]
pub struct PredictArgs {
    // --- Core Arguments ---
    /// A PDB file, or a directory whose .pdb/.ent files are processed as a batch.
    #[arg(required = true, value_name = "INPUT")]
    pub input: PathBuf,

    /// Output directory; each structure gets its own `<OUTPUT>/<stem>/` subdirectory.
    /// Defaults to `consbind_results`.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Detection Overrides ---
    /// Probe radius in Å for the cavity enclosure test.
    #[arg(long, value_name = "FLOAT")]
    pub probe_radius: Option<f64>,

    /// Minimum number of cavity points in a geometric pocket.
    #[arg(long, value_name = "INT")]
    pub min_size: Option<usize>,

    /// Lattice spacing in Å.
    #[arg(long, value_name = "FLOAT")]
    pub grid_spacing: Option<f64>,

    /// Pocket center distance in Å below which two pockets are the same site.
    #[arg(long, value_name = "FLOAT")]
    pub distance_threshold: Option<f64>,

    /// Functional class of the protein: enzyme, receptor, transporter or unknown.
    #[arg(short = 't', long, value_name = "TYPE")]
    pub protein_type: Option<String>,

    /// Seed for the random sampling, for reproducible predictions.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Skip solvent accessibility and approximate surface atoms from neighbour counts.
    #[arg(long)]
    pub no_accessibility: bool,

    // --- Output Options ---
    /// Also write a PyMOL visualization script.
    #[arg(long)]
    pub pymol: bool,

    /// Also write Chimera BILD and command scripts.
    #[arg(long)]
    pub chimera: bool,

    /// Also write a CSV table of the predicted pockets.
    #[arg(long)]
    pub csv: bool,

    // --- Batch Limits ---
    /// Stop starting new structures once this many seconds have elapsed.
    #[arg(long, value_name = "SECONDS")]
    pub time_limit: Option<u64>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S detection.grid-spacing=1.5
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}
