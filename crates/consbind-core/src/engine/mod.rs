//! # Engine Module
//!
//! This module implements the pocket-detection engine of ConSBind: the two independent
//! detectors, the consensus merger that reconciles them, and the scoring and filtering
//! stages that turn raw candidates into a ranked list of significant binding sites.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Detection parameters and their validation
//! - **Clustering** ([`cluster`]) - Hierarchical and density clustering shared by all stages
//! - **Accessibility** ([`accessibility`]) - Solvent exposure services and their outcome
//! - **Surface** ([`surface`]) - Solvent-exposed atom selection with a packing fallback
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress and warning reporting
//! - **Error Handling** ([`error`]) - Engine-specific error types
//!
//! The detection and ranking steps themselves live in crate-internal tasks driven by
//! [`crate::workflows::predict`]. Every task receives a read-only scan context holding the
//! structure, the configuration and the spatial indices built once per run.

pub mod accessibility;
pub mod cluster;
pub mod config;
pub(crate) mod context;
pub mod error;
pub mod progress;
pub mod surface;
pub mod tasks;
