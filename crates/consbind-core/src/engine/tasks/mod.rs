//! Computational stages of a prediction run.
//!
//! The two scanners are independent of each other and only read the shared scan context.
//! Their pockets flow through [`consensus`], [`scoring`] and finally [`significance`].

pub mod cavity_scan;
pub mod consensus;
pub mod energy_scan;
pub mod scoring;
pub mod significance;
