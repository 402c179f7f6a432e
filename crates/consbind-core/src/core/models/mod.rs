//! # Core Models Module
//!
//! Data structures describing a parsed protein structure and the pockets predicted on it.
//!
//! ## Key Components
//!
//! - [`atom`] - A single atom with coordinates, element, B-factor and hetero flag
//! - [`residue`] - Residues and the 20-entry standard amino acid table
//! - [`chain`] - Ordered residue containers
//! - [`structure`] - The read-only `Structure` shared by every pipeline stage
//! - [`builder`] - Incremental construction of a `Structure` from file records
//! - [`pocket`] - The `Pocket` output record and its builder
//! - [`ids`] - Stable identifiers for atoms, residues and chains
//!
//! ## Usage
//!
//! ```ignore
//! use consbind::core::models::builder::{AtomRecord, StructureBuilder};
//!
//! let mut builder = StructureBuilder::new("1abc");
//! builder.add_atom(AtomRecord::new('A', 1, "ALA", "CA", Point3::new(0.0, 0.0, 0.0)));
//! let structure = builder.build();
//! ```

pub mod atom;
pub mod builder;
pub mod chain;
pub mod ids;
pub mod pocket;
pub mod residue;
pub mod structure;
