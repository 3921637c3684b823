//! Table row types for each pipeline stage
//!
//! Every stage consumes the previous stage's rows by reference and produces a
//! new table. Missing values are `None` all the way through; they are never
//! zero-filled.

use ej_common::{ClusterFeature, Designation, Indicator, TractId, VulnerabilityTheme};
use serde::Serialize;

/// Exposure percentiles indexed by `Indicator::index()`
pub type IndicatorValues = [Option<f64>; Indicator::COUNT];

/// Vulnerability values indexed by `VulnerabilityTheme::index()`
pub type ThemeValues = [Option<f64>; VulnerabilityTheme::COUNT];

// ============================================================================
// Source rows
// ============================================================================

/// Exposure-indicator table row (the merge anchor)
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureRow {
    pub tract: TractId,
    pub population: u64,
    pub households: u64,
    pub indicators: IndicatorValues,
}

impl ExposureRow {
    /// Non-residential tracts (parks, water, correctional or industrial areas)
    pub fn is_non_residential(&self) -> bool {
        self.population == 0 || self.households == 0
    }
}

/// Social-vulnerability table row
///
/// Raw rows hold [0,1] values; after `merger::rescale_vulnerability` they
/// hold [0,100] values.
#[derive(Debug, Clone, PartialEq)]
pub struct VulnerabilityRow {
    pub tract: TractId,
    pub themes: ThemeValues,
}

/// Designation table row, keyed by a legacy-vintage identifier
#[derive(Debug, Clone, PartialEq)]
pub struct DesignationRow {
    pub legacy_tract: TractId,
    /// Categorical text exactly as read
    pub status: String,
}

/// Crosswalk row: legacy-vintage identifier → current-vintage identifier
#[derive(Debug, Clone, PartialEq)]
pub struct CrosswalkRow {
    pub legacy_tract: TractId,
    pub current_tract: TractId,
}

// ============================================================================
// Stage outputs
// ============================================================================

/// One tract after reconciliation and merging
#[derive(Debug, Clone, PartialEq)]
pub struct TractRecord {
    pub tract: TractId,
    pub population: u64,
    pub households: u64,
    pub designation: Designation,
    pub indicators: IndicatorValues,
    /// Rescaled to [0,100]
    pub vulnerability: ThemeValues,
}

impl TractRecord {
    pub fn indicator(&self, indicator: Indicator) -> Option<f64> {
        self.indicators[indicator.index()]
    }

    pub fn theme(&self, theme: VulnerabilityTheme) -> Option<f64> {
        self.vulnerability[theme.index()]
    }

    pub fn vulnerability_percentile(&self) -> Option<f64> {
        self.theme(VulnerabilityTheme::Overall)
    }

    pub fn feature(&self, feature: ClusterFeature) -> Option<f64> {
        match feature {
            ClusterFeature::Population => Some(self.population as f64),
            ClusterFeature::Households => Some(self.households as f64),
            ClusterFeature::Exposure(indicator) => self.indicator(indicator),
            ClusterFeature::Vulnerability(theme) => self.theme(theme),
        }
    }

    pub fn is_dac(&self) -> u8 {
        self.designation.flag()
    }
}

/// Burden scores for one tract
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTract {
    pub tract: TractId,
    pub population: u64,
    pub households: u64,
    pub is_dac: u8,
    pub vulnerability_percentile: Option<f64>,
    pub pollution_score: Option<f64>,
    pub hazardprox_score: Option<f64>,
    pub cumulative_burden_score: Option<f64>,
    pub weighted_burden: Option<f64>,
    /// Weighted burden divided by the run's maximum weighted burden
    pub weighted_burden_norm: Option<f64>,
}

/// A tract that survived missing-feature filtering, with its label
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteredTract {
    pub tract: TractId,
    /// Raw (unstandardized) values in clustering-feature order
    pub features: Vec<f64>,
    pub cluster: usize,
    pub is_dac: u8,
}

/// Per-cluster means and designated share
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub cluster: usize,
    pub tract_count: usize,
    /// Feature means rounded to one decimal, in clustering-feature order
    pub feature_means: Vec<f64>,
    pub percent_dac: f64,
}

/// Condensed row consumed by the mapping step
#[derive(Debug, Clone, PartialEq)]
pub struct MapRow {
    pub tract: TractId,
    pub is_dac: u8,
    pub pollution_score: Option<f64>,
    pub hazardprox_score: Option<f64>,
    pub vulnerability_percentile: Option<f64>,
    pub cumulative_burden_score: Option<f64>,
    pub weighted_burden_norm: Option<f64>,
    /// `None` when the tract was excluded from clustering
    pub cluster: Option<usize>,
}

/// Match-type distribution of one left join
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JoinReport {
    pub join: String,
    /// Result rows with a match on both sides
    pub both: usize,
    /// Left rows with no match
    pub left_only: usize,
    /// Right rows never referenced by the left side (not part of a left join's output)
    pub right_unused: usize,
    pub left_only_tracts: Vec<TractId>,
}

impl JoinReport {
    pub fn new(join: impl Into<String>) -> Self {
        Self {
            join: join.into(),
            ..Self::default()
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "both={}, left_only={}, right_unused={}",
            self.both, self.left_only, self.right_unused
        )
    }
}
