use super::ids::{AtomId, ChainId};
use phf::{Map, Set, phf_map, phf_set};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AminoAcid {
    // --- Aliphatic, Nonpolar ---
    Alanine,
    Glycine,
    Isoleucine,
    Leucine,
    Proline,
    Valine,
    Methionine,

    // --- Aromatic ---
    Phenylalanine,
    Tryptophan,
    Tyrosine,

    // --- Polar, Uncharged ---
    Asparagine,
    Cysteine,
    Glutamine,
    Serine,
    Threonine,

    // --- Charged ---
    Arginine,
    Histidine,
    Lysine,
    AsparticAcid,
    GlutamicAcid,
}

static AMINO_ACID_CODES: Map<&'static str, AminoAcid> = phf_map! {
    "ALA" => AminoAcid::Alanine, "GLY" => AminoAcid::Glycine, "ILE" => AminoAcid::Isoleucine,
    "LEU" => AminoAcid::Leucine, "PRO" => AminoAcid::Proline, "VAL" => AminoAcid::Valine,
    "MET" => AminoAcid::Methionine, "PHE" => AminoAcid::Phenylalanine,
    "TRP" => AminoAcid::Tryptophan, "TYR" => AminoAcid::Tyrosine,
    "ASN" => AminoAcid::Asparagine, "CYS" => AminoAcid::Cysteine, "GLN" => AminoAcid::Glutamine,
    "SER" => AminoAcid::Serine, "THR" => AminoAcid::Threonine, "ARG" => AminoAcid::Arginine,
    "HIS" => AminoAcid::Histidine, "LYS" => AminoAcid::Lysine,
    "ASP" => AminoAcid::AsparticAcid, "GLU" => AminoAcid::GlutamicAcid,
};

static WATER_NAMES: Set<&'static str> = phf_set! {
    "HOH", "WAT", "H2O", "DOD", "TIP", "TIP3", "SOL",
};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("'{0}' is not one of the 20 standard amino acid codes")]
pub struct ParseAminoAcidError(pub String);

impl FromStr for AminoAcid {
    type Err = ParseAminoAcidError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AMINO_ACID_CODES
            .get(s.trim().to_ascii_uppercase().as_str())
            .copied()
            .ok_or_else(|| ParseAminoAcidError(s.to_string()))
    }
}

impl AminoAcid {
    pub fn code(&self) -> &'static str {
        match self {
            AminoAcid::Alanine => "ALA",
            AminoAcid::Glycine => "GLY",
            AminoAcid::Isoleucine => "ILE",
            AminoAcid::Leucine => "LEU",
            AminoAcid::Proline => "PRO",
            AminoAcid::Valine => "VAL",
            AminoAcid::Methionine => "MET",
            AminoAcid::Phenylalanine => "PHE",
            AminoAcid::Tryptophan => "TRP",
            AminoAcid::Tyrosine => "TYR",
            AminoAcid::Asparagine => "ASN",
            AminoAcid::Cysteine => "CYS",
            AminoAcid::Glutamine => "GLN",
            AminoAcid::Serine => "SER",
            AminoAcid::Threonine => "THR",
            AminoAcid::Arginine => "ARG",
            AminoAcid::Histidine => "HIS",
            AminoAcid::Lysine => "LYS",
            AminoAcid::AsparticAcid => "ASP",
            AminoAcid::GlutamicAcid => "GLU",
        }
    }

    /// Kyte–Doolittle hydropathy index.
    pub fn hydropathy(&self) -> f64 {
        match self {
            AminoAcid::Isoleucine => 4.5,
            AminoAcid::Valine => 4.2,
            AminoAcid::Leucine => 3.8,
            AminoAcid::Phenylalanine => 2.8,
            AminoAcid::Cysteine => 2.5,
            AminoAcid::Methionine => 1.9,
            AminoAcid::Alanine => 1.8,
            AminoAcid::Glycine => -0.4,
            AminoAcid::Threonine => -0.7,
            AminoAcid::Serine => -0.8,
            AminoAcid::Tryptophan => -0.9,
            AminoAcid::Tyrosine => -1.3,
            AminoAcid::Proline => -1.6,
            AminoAcid::Histidine => -3.2,
            AminoAcid::GlutamicAcid
            | AminoAcid::Glutamine
            | AminoAcid::AsparticAcid
            | AminoAcid::Asparagine => -3.5,
            AminoAcid::Lysine => -3.9,
            AminoAcid::Arginine => -4.5,
        }
    }

    /// Effective side-chain charge used by the electrostatic field; `None` for residues
    /// that do not contribute.
    pub fn field_charge(&self) -> Option<f64> {
        match self {
            AminoAcid::Arginine | AminoAcid::Lysine => Some(1.0),
            AminoAcid::Histidine => Some(0.5),
            AminoAcid::AsparticAcid | AminoAcid::GlutamicAcid => Some(-1.0),
            AminoAcid::Serine
            | AminoAcid::Threonine
            | AminoAcid::Asparagine
            | AminoAcid::Glutamine
            | AminoAcid::Tyrosine => Some(0.1),
            _ => None,
        }
    }

    /// Theoretical maximum accessible surface area in Å² (Tien et al., 2013).
    pub fn max_accessible_area(&self) -> f64 {
        match self {
            AminoAcid::Alanine => 129.0,
            AminoAcid::Arginine => 274.0,
            AminoAcid::Asparagine => 195.0,
            AminoAcid::AsparticAcid => 193.0,
            AminoAcid::Cysteine => 167.0,
            AminoAcid::Glutamine => 225.0,
            AminoAcid::GlutamicAcid => 223.0,
            AminoAcid::Glycine => 104.0,
            AminoAcid::Histidine => 224.0,
            AminoAcid::Isoleucine => 197.0,
            AminoAcid::Leucine => 201.0,
            AminoAcid::Lysine => 236.0,
            AminoAcid::Methionine => 224.0,
            AminoAcid::Phenylalanine => 240.0,
            AminoAcid::Proline => 159.0,
            AminoAcid::Serine => 155.0,
            AminoAcid::Threonine => 172.0,
            AminoAcid::Tryptophan => 285.0,
            AminoAcid::Tyrosine => 263.0,
            AminoAcid::Valine => 174.0,
        }
    }

    pub fn is_hydrophobic(&self) -> bool {
        matches!(
            self,
            AminoAcid::Alanine
                | AminoAcid::Valine
                | AminoAcid::Leucine
                | AminoAcid::Isoleucine
                | AminoAcid::Methionine
                | AminoAcid::Phenylalanine
                | AminoAcid::Tryptophan
                | AminoAcid::Proline
        )
    }

    pub fn is_polar(&self) -> bool {
        matches!(
            self,
            AminoAcid::Serine
                | AminoAcid::Threonine
                | AminoAcid::Cysteine
                | AminoAcid::Tyrosine
                | AminoAcid::Asparagine
                | AminoAcid::Glutamine
                | AminoAcid::Histidine
        )
    }

    pub fn is_charged(&self) -> bool {
        matches!(
            self,
            AminoAcid::Lysine
                | AminoAcid::Arginine
                | AminoAcid::AsparticAcid
                | AminoAcid::GlutamicAcid
        )
    }

    pub fn is_aromatic(&self) -> bool {
        matches!(
            self,
            AminoAcid::Phenylalanine
                | AminoAcid::Tyrosine
                | AminoAcid::Tryptophan
                | AminoAcid::Histidine
        )
    }

    pub fn is_metal_coordinating(&self) -> bool {
        matches!(
            self,
            AminoAcid::Histidine
                | AminoAcid::Cysteine
                | AminoAcid::AsparticAcid
                | AminoAcid::GlutamicAcid
        )
    }
}

impl fmt::Display for AminoAcid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

pub fn is_water_name(name: &str) -> bool {
    WATER_NAMES.contains(name.trim().to_ascii_uppercase().as_str())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Residue {
    pub number: isize,               // Residue sequence number from source file
    pub insertion_code: char,        // PDB insertion code, ' ' when absent
    pub name: String,                // Three-letter residue name (e.g., "ALA", "HEM")
    pub chain_id: ChainId,           // ID of the parent chain
    amino_acid: Option<AminoAcid>,   // Resolved standard amino acid, if any
    pub(crate) atoms: Vec<AtomId>,   // Atoms in file order
}

impl Residue {
    pub(crate) fn new(number: isize, insertion_code: char, name: &str, chain_id: ChainId) -> Self {
        let name = name.trim().to_ascii_uppercase();
        Self {
            number,
            insertion_code,
            amino_acid: name.parse().ok(),
            name,
            chain_id,
            atoms: Vec::new(),
        }
    }

    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }

    pub fn amino_acid(&self) -> Option<AminoAcid> {
        self.amino_acid
    }

    pub fn is_standard_amino_acid(&self) -> bool {
        self.amino_acid.is_some()
    }

    pub fn is_water(&self) -> bool {
        is_water_name(&self.name)
    }
}
