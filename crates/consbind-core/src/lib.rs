//! # ConSBind Core Library
//!
//! Consensus prediction of ligand-binding pockets on protein structures.
//!
//! Two independent detectors scan a structure: a grid-based geometric cavity search and a
//! physicochemical energy-field scan. Their pockets are merged into a consensus ranking,
//! scored, and finally filtered down to the statistically significant subset without any
//! user-supplied score threshold.
//!
//! ## Architecture
//!
//! - **[`core`]: The Foundation.** Immutable structure models (`Structure`, `Residue`,
//!   `Atom`), the `Pocket` value type, the kd-tree spatial index, residue property tables,
//!   and file I/O (PDB reading, prediction reports).
//!
//! - **[`engine`]: The Logic Core.** Configuration, diagnostics reporting, the shared
//!   clustering engine, surface classification, and the individual pipeline tasks
//!   (cavity scan, energy scan, consensus merge, scoring, significance filter).
//!
//! - **[`workflows`]: The Public API.** The end-to-end prediction run that ties the
//!   tasks together for a single structure.

pub mod core;
pub mod engine;
pub mod workflows;
