//! # Core Module
//!
//! Stateless building blocks shared by every stage of the prediction pipeline.
//!
//! - **Molecular Representation** ([`models`]) - Atoms, residues, chains, the read-only
//!   `Structure`, and the `Pocket` output record
//! - **Spatial Queries** ([`spatial`]) - kd-tree backed nearest-neighbour and radius search
//! - **File I/O** ([`io`]) - PDB ingestion and prediction report writers
//! - **Utilities** ([`utils`]) - Bounding boxes, lattices and sphere sampling

pub mod io;
pub mod models;
pub mod spatial;
pub mod utils;
