use crate::core::io::pdb::{PdbMetadata, write_atom_records};
use crate::core::models::pocket::Pocket;
use crate::core::models::structure::Structure;
use crate::core::spatial::{AtomIndex, LiningResidue};
use itertools::Itertools;
use nalgebra::Point3;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const LINING_RADIUS: f64 = 8.0;
const MARKER_CHAIN: char = 'X';
const MARKER_FIRST_SERIAL: usize = 10_000;
const MAX_MARKER_POINTS: usize = 20;

/// PyMOL colours keyed by the lower bound of `consensus / 5`, best first.
const PYMOL_COLOURS: &[(f64, &str)] = &[
    (0.9, "forest"),
    (0.75, "lime"),
    (0.6, "limon"),
    (0.45, "yellow"),
    (0.3, "orange"),
    (0.15, "salmon"),
    (0.0, "red"),
];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Which optional artefacts to emit in addition to the summary and marked structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportOptions {
    pub pymol: bool,
    pub chimera: bool,
    pub csv: bool,
}

#[derive(Debug, Serialize)]
struct PocketRow<'a> {
    site: usize,
    origin: String,
    methods: String,
    consensus_score: f64,
    final_score: f64,
    raw_score: f64,
    druggability: Option<f64>,
    knowledge_score: Option<f64>,
    size: usize,
    center_x: f64,
    center_y: f64,
    center_z: f64,
    residues: &'a str,
}

fn residue_label(residue: &LiningResidue) -> String {
    format!("{}:{}{}", residue.chain_id, residue.name, residue.number)
}

fn method_list(pocket: &Pocket) -> Vec<String> {
    pocket.methods().iter().map(ToString::to_string).collect()
}

fn pymol_colour(consensus: f64) -> &'static str {
    let normalized = (consensus / 5.0).clamp(0.0, 1.0);
    PYMOL_COLOURS
        .iter()
        .find(|(threshold, _)| normalized >= *threshold)
        .map_or("red", |&(_, colour)| colour)
}

fn chimera_rgb(final_score: f64) -> (f64, f64, f64) {
    if final_score > 4.0 {
        (0.13, 0.55, 0.13)
    } else if final_score > 3.0 {
        (0.0, 1.0, 0.0)
    } else if final_score > 2.0 {
        (1.0, 1.0, 0.0)
    } else if final_score > 1.0 {
        (1.0, 0.65, 0.0)
    } else if final_score > 0.5 {
        (1.0, 0.27, 0.0)
    } else {
        (1.0, 0.0, 0.0)
    }
}

/// Evenly strided subset of at most `MAX_MARKER_POINTS` member points.
fn marker_points(points: &[Point3<f64>]) -> Vec<Point3<f64>> {
    if points.len() <= MAX_MARKER_POINTS {
        return points.to_vec();
    }
    (0..MAX_MARKER_POINTS)
        .map(|i| points[i * points.len() / MAX_MARKER_POINTS])
        .collect()
}

fn marker_line(
    serial: usize,
    atom_name: &str,
    site: usize,
    point: &Point3<f64>,
    b_factor: f64,
) -> String {
    format!(
        "ATOM  {:>5}  {:<3} SIT {}{:>3}    {:>8.3}{:>8.3}{:>8.3}  1.00{:>6.2}           {}",
        serial % 100_000,
        atom_name,
        MARKER_CHAIN,
        site % 1000,
        point.x,
        point.y,
        point.z,
        b_factor,
        atom_name
    )
}

/// Ranked pockets of one structure together with their lining residues, ready to be
/// rendered in every supported output format.
pub struct PocketReport<'a> {
    structure: &'a Structure,
    pockets: &'a [Pocket],
    residues: Vec<Vec<LiningResidue>>,
}

impl<'a> PocketReport<'a> {
    pub fn new(structure: &'a Structure, pockets: &'a [Pocket]) -> Self {
        let index = AtomIndex::new(structure);
        let residues = pockets
            .iter()
            .map(|pocket| {
                index.lining_residues(structure, pocket.center(), LINING_RADIUS)
            })
            .collect();
        Self {
            structure,
            pockets,
            residues,
        }
    }

    pub fn pockets(&self) -> &[Pocket] {
        self.pockets
    }

    pub fn residues(&self, site_index: usize) -> &[LiningResidue] {
        self.residues
            .get(site_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn write_summary(&self, writer: &mut impl Write) -> io::Result<()> {
        writeln!(writer, "Predicted Binding Sites")?;
        writeln!(writer, "======================")?;
        writeln!(writer)?;
        if self.pockets.is_empty() {
            writeln!(writer, "No binding sites predicted.")?;
            return Ok(());
        }

        for (i, pocket) in self.pockets.iter().enumerate() {
            let center = pocket.center();
            writeln!(writer, "Site {}:", i + 1)?;
            writeln!(
                writer,
                "Detection Methods: {}",
                method_list(pocket).join(", ")
            )?;
            writeln!(writer, "Consensus Score: {:.2}", pocket.consensus_score())?;
            writeln!(
                writer,
                "Binding Potential Score: {:.2}",
                pocket.final_score()
            )?;
            if let Some(druggability) = pocket.druggability() {
                writeln!(writer, "Druggability: {:.2}", druggability)?;
            }
            if let Some(knowledge) = pocket.knowledge_score() {
                writeln!(writer, "Knowledge-based Score: {:.2}", knowledge)?;
            }
            writeln!(writer, "Size: {}", pocket.size())?;
            writeln!(
                writer,
                "Center: {:.3}, {:.3}, {:.3}",
                center.x,
                center.y,
                center.z
            )?;
            writeln!(writer)?;
            writeln!(writer, "Binding Site Residues:")?;
            for residue in self.residues(i) {
                writeln!(writer, "  {}", residue_label(residue))?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    /// The input structure followed by one `SIT` residue per site on chain `X`: an `O`
    /// atom at the center carrying the consensus score as B-factor, plus `H` atoms at up
    /// to twenty member points.
    pub fn write_marked_structure(
        &self,
        metadata: &PdbMetadata,
        writer: &mut impl Write,
    ) -> io::Result<()> {
        for line in &metadata.header_lines {
            writeln!(writer, "{}", line)?;
        }
        writeln!(writer, "REMARK   Predicted Binding Sites")?;
        for (i, pocket) in self.pockets.iter().enumerate() {
            writeln!(
                writer,
                "REMARK   Site {} - Method: {}, Consensus: {:.2}, Binding Potential: {:.2}",
                i + 1,
                pocket.origin(),
                pocket.consensus_score(),
                pocket.final_score()
            )?;
        }
        write_atom_records(self.structure, writer)?;

        let mut serial = MARKER_FIRST_SERIAL;
        for (i, pocket) in self.pockets.iter().enumerate() {
            let site = i + 1;
            writeln!(
                writer,
                "{}",
                marker_line(serial, "O", site, pocket.center(), pocket.consensus_score())
            )?;
            serial += 1;
            for point in marker_points(pocket.points()) {
                writeln!(writer, "{}", marker_line(serial, "H", site, &point, 0.0))?;
                serial += 1;
            }
        }
        writeln!(writer, "TER")?;
        writeln!(writer, "END")?;
        Ok(())
    }

    pub fn write_csv(&self, writer: impl Write) -> Result<(), ReportError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for (i, pocket) in self.pockets.iter().enumerate() {
            let residues = self
                .residues(i)
                .iter()
                .map(residue_label)
                .join(" ");
            let center = pocket.center();
            csv_writer.serialize(PocketRow {
                site: i + 1,
                origin: pocket.origin().to_string(),
                methods: method_list(pocket).join(";"),
                consensus_score: pocket.consensus_score(),
                final_score: pocket.final_score(),
                raw_score: pocket.raw_score(),
                druggability: pocket.druggability(),
                knowledge_score: pocket.knowledge_score(),
                size: pocket.size(),
                center_x: center.x,
                center_y: center.y,
                center_z: center.z,
                residues: &residues,
            })?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn write_pymol_script(
        &self,
        structure_file: &str,
        writer: &mut impl Write,
    ) -> io::Result<()> {
        let object_stem = Path::new(structure_file)
            .file_stem()
            .map_or_else(
                || "structure".to_string(),
                |s| s.to_string_lossy().into_owned(),
            );

        writeln!(
            writer,
            "# PyMOL script for visualizing predicted binding sites"
        )?;
        writeln!(writer, "load {}, main_obj", structure_file)?;
        writeln!(writer, "hide everything")?;
        writeln!(writer, "bg_color white")?;
        writeln!(writer, "set antialias, 2")?;
        writeln!(writer, "set sphere_quality, 2")?;
        writeln!(writer, "set depth_cue, 0")?;
        writeln!(writer, "set label_size, 10")?;
        writeln!(writer, "set label_color, black")?;
        writeln!(writer, "set float_labels, on")?;
        writeln!(
            writer,
            "show cartoon, main_obj and not chain {}",
            MARKER_CHAIN
        )?;
        writeln!(
            writer,
            "color gray80, main_obj and not chain {}",
            MARKER_CHAIN
        )?;
        writeln!(writer, "set cartoon_transparency, 0.5")?;
        writeln!(writer)?;
        writeln!(writer, "# Show ligands in magenta")?;
        writeln!(
            writer,
            "select ligands, main_obj and hetatm and not resn HOH and not chain {}",
            MARKER_CHAIN
        )?;
        writeln!(writer, "show sticks, ligands")?;
        writeln!(writer, "color magenta, ligands")?;
        writeln!(writer)?;

        for (i, pocket) in self.pockets.iter().enumerate() {
            let site = i + 1;
            let colour = pymol_colour(pocket.consensus_score());
            let center = pocket.center();

            let markers = format!("main_obj and chain {MARKER_CHAIN} and resi {site}");

            writeln!(writer, "# Binding site {}", site)?;
            writeln!(writer, "select site_{site}_center, ({markers} and name O)")?;
            writeln!(writer, "select site_{site}_points, ({markers} and name H)")?;
            writeln!(writer, "show spheres, site_{site}_center")?;
            writeln!(writer, "color black, site_{site}_center")?;
            writeln!(writer, "set sphere_scale, 1.0, site_{site}_center")?;
            writeln!(writer, "show spheres, site_{site}_points")?;
            writeln!(writer, "color {colour}, site_{site}_points")?;
            writeln!(writer, "set sphere_scale, 0.6, site_{site}_points")?;

            let residues = self.residues(i);
            if !residues.is_empty() {
                let selection = residues
                    .iter()
                    .map(|r| {
                        format!("(main_obj and chain {} and resi {})", r.chain_id, r.number)
                    })
                    .join(" or ");
                writeln!(writer, "select site_{site}_res, ({selection})")?;
                writeln!(writer, "show sticks, site_{site}_res")?;
                writeln!(writer, "color {colour}, site_{site}_res")?;
                writeln!(writer, "create site_{site}_surface, site_{site}_res")?;
                writeln!(writer, "show surface, site_{site}_surface")?;
                writeln!(writer, "set surface_color, {colour}, site_{site}_surface")?;
                writeln!(writer, "set transparency, 0.3, site_{site}_surface")?;
            }

            writeln!(
                writer,
                "pseudoatom label_obj_{site}, pos=[{:.3}, {:.3}, {:.3}]",
                center.x, center.y, center.z
            )?;
            writeln!(writer, "set sphere_scale, 0.01, label_obj_{site}")?;
            writeln!(
                writer,
                "label label_obj_{site}, \"Site {site} (Score: {:.1})\"",
                pocket.final_score()
            )?;
            writeln!(writer, "# Consensus Score: {:.2}", pocket.consensus_score())?;
            writeln!(
                writer,
                "# Binding Potential Score: {:.2}",
                pocket.final_score()
            )?;
            writeln!(writer, "# Size: {}", pocket.size())?;
            writeln!(
                writer,
                "# Detection Methods: {}",
                method_list(pocket).join(", ")
            )?;
            writeln!(writer)?;
        }

        writeln!(writer, "orient")?;
        writeln!(writer, "zoom main_obj, 20")?;
        writeln!(writer, "center main_obj")?;
        writeln!(writer, "set ray_shadows, 1")?;
        writeln!(writer, "set ray_trace_mode, 1")?;
        writeln!(writer, "set ray_opaque_background, on")?;
        writeln!(writer, "group binding_sites_centers, site_*_center")?;
        writeln!(writer, "group binding_sites_points, site_*_points")?;
        writeln!(writer, "group binding_sites_residues, site_*_res")?;
        writeln!(writer, "group labels, label_obj_*")?;
        writeln!(writer, "group surfaces, *_surface")?;
        writeln!(writer, "save {}_binding_sites.pse", object_stem)?;
        Ok(())
    }

    pub fn write_chimera_bild(&self, writer: &mut impl Write) -> io::Result<()> {
        writeln!(writer, ".transparency 0.0")?;
        for (i, pocket) in self.pockets.iter().enumerate() {
            let score = pocket.final_score();
            let (r, g, b) = chimera_rgb(score);
            let center = pocket.center();
            writeln!(
                writer,
                ".comment Binding site {} (Score: {:.2})",
                i + 1,
                score
            )?;
            writeln!(writer, ".color {:.2} {:.2} {:.2}", r, g, b)?;
            writeln!(
                writer,
                ".sphere {:.2} {:.2} {:.2} 2.0",
                center.x,
                center.y,
                center.z
            )?;
            writeln!(writer)?;
        }
        Ok(())
    }

    pub fn write_chimera_script(&self, bild_file: &str, writer: &mut impl Write) -> io::Result<()> {
        writeln!(writer, "# Chimera script for visualizing binding sites")?;
        writeln!(
            writer,
            "# Open the structure first, then run: open <this file>"
        )?;
        writeln!(writer, "background solid white")?;
        writeln!(writer, "open {}", bild_file)?;
        writeln!(writer, "focus")?;
        Ok(())
    }
}

/// Writes all report artefacts of one structure as `<output_dir>/<prefix>_<kind>.<ext>`.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    prefix: String,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, prefix: &str) -> Self {
        Self {
            output_dir: output_dir.into(),
            prefix: prefix.to_string(),
        }
    }

    pub fn file_name(&self, suffix: &str) -> String {
        format!("{}_{}", self.prefix, suffix)
    }

    pub fn path_for(&self, suffix: &str) -> PathBuf {
        self.output_dir.join(self.file_name(suffix))
    }

    fn create(&self, suffix: &str) -> io::Result<(PathBuf, BufWriter<File>)> {
        let path = self.path_for(suffix);
        let file = File::create(&path)?;
        Ok((path, BufWriter::new(file)))
    }

    /// Writes the summary and marked structure, plus whatever `options` enables, and
    /// returns the paths written.
    pub fn write(
        &self,
        report: &PocketReport<'_>,
        metadata: &PdbMetadata,
        options: ReportOptions,
    ) -> Result<Vec<PathBuf>, ReportError> {
        fs::create_dir_all(&self.output_dir)?;
        let mut written = Vec::new();

        let (path, mut writer) = self.create("predictions.txt")?;
        report.write_summary(&mut writer)?;
        writer.flush()?;
        written.push(path);

        let structure_file = self.file_name("predicted.pdb");
        let (path, mut writer) = self.create("predicted.pdb")?;
        report.write_marked_structure(metadata, &mut writer)?;
        writer.flush()?;
        written.push(path);

        if options.csv {
            let (path, writer) = self.create("pockets.csv")?;
            report.write_csv(writer)?;
            written.push(path);
        }

        if options.pymol {
            let (path, mut writer) = self.create("pymol.pml")?;
            report.write_pymol_script(&structure_file, &mut writer)?;
            writer.flush()?;
            written.push(path);
        }

        if options.chimera {
            let bild_file = self.file_name("spheres.bild");
            let (path, mut writer) = self.create("spheres.bild")?;
            report.write_chimera_bild(&mut writer)?;
            writer.flush()?;
            written.push(path);

            let (path, mut writer) = self.create("chimera.cmd")?;
            report.write_chimera_script(&bild_file, &mut writer)?;
            writer.flush()?;
            written.push(path);
        }

        Ok(written)
    }
}
