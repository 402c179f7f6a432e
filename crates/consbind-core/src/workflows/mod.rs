//! # Workflows Module
//!
//! High-level entry points that run the complete pocket-prediction pipeline for one
//! structure.
//!
//! ## Overview
//!
//! A workflow owns the order of the pipeline: accessibility evaluation, the two
//! independent scanners, geometric scoring, consensus merging, protein-type adjustment,
//! and the significance filter. It reports each phase through the injected
//! [`ProgressReporter`](crate::engine::progress::ProgressReporter) and returns a result
//! that records which fallback paths were taken along the way.
//!
//! - **Prediction Workflow** ([`predict`]) - Consensus binding-site prediction.

pub mod predict;
