//! # EJ Common Library
//!
//! Shared code for the environmental-justice burden pipeline:
//! - Error taxonomy (join integrity, scale, mapping, clustering)
//! - Configuration loading
//! - Tract identifiers and designation categories
//! - Indicator catalogue and column renaming

pub mod config;
pub mod error;
pub mod indicators;
pub mod tract;

pub use error::{Error, Result};
pub use indicators::{ClusterFeature, Indicator, VulnerabilityTheme};
pub use tract::{Designation, TractId};
