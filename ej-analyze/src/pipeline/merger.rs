//! Dataset Merger
//!
//! Builds one row per tract, left-anchored on the exposure table:
//! exposure, left-joined to reconciled designations, then to rescaled
//! vulnerability.
//!
//! A left-only row is accepted only when its anchor row is non-residential
//! (zero population or zero households), because the residential filter drops
//! it anyway. Any other left-only row halts the run.

use crate::types::{ExposureRow, JoinReport, ThemeValues, TractRecord, VulnerabilityRow};
use ej_common::{Designation, Error, Indicator, Result, TractId, VulnerabilityTheme};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

const PERCENTILE_RANGE: (f64, f64) = (0.0, 100.0);
const VULNERABILITY_RAW_RANGE: (f64, f64) = (0.0, 1.0);

/// Merged table plus the diagnostics of both joins
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub records: Vec<TractRecord>,
    pub designation_join: JoinReport,
    pub vulnerability_join: JoinReport,
    /// Anchor tracts removed by the population/household filter
    pub dropped_non_residential: Vec<TractId>,
}

fn in_range(value: f64, (low, high): (f64, f64)) -> bool {
    value >= low && value <= high
}

/// Check every exposure percentile lies in [0,100] when present
pub fn validate_exposure_scale(rows: &[ExposureRow]) -> Result<()> {
    for indicator in Indicator::ALL {
        let offending = rows
            .iter()
            .filter_map(|r| r.indicators[indicator.index()])
            .filter(|v| !in_range(*v, PERCENTILE_RANGE))
            .count();
        if offending > 0 {
            return Err(Error::ScaleMismatch {
                column: indicator.raw_column().to_string(),
                expected: "[0, 100]".to_string(),
                offending_rows: offending,
            });
        }
    }
    Ok(())
}

/// Validate raw [0,1] vulnerability values and rescale them to [0,100]
///
/// A value equal to `missing_sentinel` is read as missing. Any other value
/// outside [0,1] is a scale fault, so already-rescaled input is caught here
/// instead of being multiplied twice.
pub fn rescale_vulnerability(
    rows: &[VulnerabilityRow],
    missing_sentinel: Option<f64>,
) -> Result<Vec<VulnerabilityRow>> {
    let is_sentinel = |v: f64| missing_sentinel.map_or(false, |s| v == s);

    for theme in VulnerabilityTheme::ALL {
        let offending = rows
            .iter()
            .filter_map(|r| r.themes[theme.index()])
            .filter(|v| !is_sentinel(*v) && !in_range(*v, VULNERABILITY_RAW_RANGE))
            .count();
        if offending > 0 {
            return Err(Error::ScaleMismatch {
                column: theme.raw_column().to_string(),
                expected: "[0, 1]".to_string(),
                offending_rows: offending,
            });
        }
    }

    let mut sentinel_cells = 0usize;
    let rescaled = rows
        .iter()
        .map(|row| {
            let mut themes: ThemeValues = [None; VulnerabilityTheme::COUNT];
            for (slot, value) in themes.iter_mut().zip(row.themes) {
                *slot = match value {
                    Some(v) if is_sentinel(v) => {
                        sentinel_cells += 1;
                        None
                    }
                    Some(v) => Some(v * 100.0),
                    None => None,
                };
            }
            VulnerabilityRow {
                tract: row.tract.clone(),
                themes,
            }
        })
        .collect();

    if sentinel_cells > 0 {
        debug!(sentinel_cells, "Vulnerability sentinel values read as missing");
    }
    Ok(rescaled)
}

/// Fail when left-only rows exist that the residential filter would not drop
fn ensure_explained(join: &JoinReport, anchor: &HashMap<&TractId, &ExposureRow>) -> Result<()> {
    let unexplained: Vec<&str> = join
        .left_only_tracts
        .iter()
        .filter(|t| anchor.get(t).map_or(true, |row| !row.is_non_residential()))
        .map(|t| t.as_str())
        .collect();

    if unexplained.is_empty() {
        if join.left_only > 0 {
            info!(
                join = %join.join,
                left_only = join.left_only,
                "Left-only rows are all non-residential tracts"
            );
        }
        Ok(())
    } else {
        Err(Error::JoinIntegrity {
            join: join.join.clone(),
            report: format!(
                "{}; {} residential tract(s) unmatched: {}",
                join.summary(),
                unexplained.len(),
                unexplained.join(", ")
            ),
        })
    }
}

/// Join exposure, designations and (already rescaled) vulnerability
pub fn merge(
    exposure: &[ExposureRow],
    designations: &BTreeMap<TractId, Designation>,
    vulnerability: &[VulnerabilityRow],
) -> Result<MergeOutcome> {
    let anchor: HashMap<&TractId, &ExposureRow> =
        exposure.iter().map(|r| (&r.tract, r)).collect();
    let vulnerability_by_tract: HashMap<&TractId, &VulnerabilityRow> =
        vulnerability.iter().map(|r| (&r.tract, r)).collect();

    // Join 1: exposure with designations
    let mut designation_join = JoinReport::new("exposure/designation");
    let joined: Vec<(&ExposureRow, Option<Designation>)> = exposure
        .iter()
        .map(|row| {
            let designation = designations.get(&row.tract).copied();
            if designation.is_some() {
                designation_join.both += 1;
            } else {
                designation_join.left_only += 1;
                designation_join.left_only_tracts.push(row.tract.clone());
            }
            (row, designation)
        })
        .collect();
    designation_join.right_unused = designations
        .keys()
        .filter(|t| !anchor.contains_key(t))
        .count();
    info!(
        both = designation_join.both,
        left_only = designation_join.left_only,
        right_unused = designation_join.right_unused,
        "Exposure/designation join"
    );
    ensure_explained(&designation_join, &anchor)?;

    // Join 2: the result with vulnerability
    let mut vulnerability_join = JoinReport::new("exposure/vulnerability");
    let joined: Vec<(&ExposureRow, Option<Designation>, Option<&VulnerabilityRow>)> = joined
        .into_iter()
        .map(|(row, designation)| {
            let svi = vulnerability_by_tract.get(&row.tract).copied();
            if svi.is_some() {
                vulnerability_join.both += 1;
            } else {
                vulnerability_join.left_only += 1;
                vulnerability_join.left_only_tracts.push(row.tract.clone());
            }
            (row, designation, svi)
        })
        .collect();
    vulnerability_join.right_unused = vulnerability
        .iter()
        .filter(|r| !anchor.contains_key(&r.tract))
        .count();
    info!(
        both = vulnerability_join.both,
        left_only = vulnerability_join.left_only,
        right_unused = vulnerability_join.right_unused,
        "Exposure/vulnerability join"
    );
    ensure_explained(&vulnerability_join, &anchor)?;

    // Residential filter runs after both joins
    let mut records = Vec::with_capacity(joined.len());
    let mut dropped_non_residential = Vec::new();
    for (row, designation, svi) in joined {
        if row.is_non_residential() {
            dropped_non_residential.push(row.tract.clone());
            continue;
        }
        let (designation, svi) = match (designation, svi) {
            (Some(d), Some(s)) => (d, s),
            _ => {
                return Err(Error::JoinIntegrity {
                    join: "exposure/merged".to_string(),
                    report: format!("residential tract {} lost a join partner", row.tract),
                })
            }
        };
        records.push(TractRecord {
            tract: row.tract.clone(),
            population: row.population,
            households: row.households,
            designation,
            indicators: row.indicators,
            vulnerability: svi.themes,
        });
    }

    if !dropped_non_residential.is_empty() {
        warn!(
            dropped = dropped_non_residential.len(),
            "Dropped tracts with zero population or households"
        );
    }
    info!(tracts = records.len(), "Merged tract table built");

    Ok(MergeOutcome {
        records,
        designation_join,
        vulnerability_join,
        dropped_non_residential,
    })
}
