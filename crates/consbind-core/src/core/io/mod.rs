//! Provides input/output functionality for structure files and prediction reports.
//!
//! Structures are read through the [`traits::MolecularFile`] interface (implemented for
//! PDB by [`pdb::PdbFile`]); predictions are rendered by [`report`] as a text summary, a
//! marker-augmented PDB file, a CSV table, and PyMOL/Chimera visualisation scripts.

pub mod pdb;
pub mod report;
pub mod traits;
